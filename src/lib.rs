//! A Rust implementation of the Progressive Graphics File (PGF) codec core.
//!
//! PGF encodes raster images into a multi-resolution bitstream: each level
//! payload refines the previously decoded image by one dyadic step, and any
//! prefix of the stream decodes into a lower-resolution reconstruction.
//! The crate covers the reversible integer lifting transform, the subband
//! and ROI tile machinery, the bitstream container and the image façade;
//! entropy coding is a pluggable seam (see [`codec::LevelCodec`]).
//!
//! # Quick Start
//!
//! ```ignore
//! use pgf_codec::{Header, ImageMode, PgfImage};
//! use std::io::Cursor;
//!
//! // Encode a single grayscale channel losslessly
//! let mut pgf = PgfImage::new();
//! let header = Header {
//!     width: 640,
//!     height: 480,
//!     mode: ImageMode::GrayScale,
//!     ..Header::default()
//! };
//! pgf.set_header(header, 0, Vec::new())?;
//! pgf.import_channels(&[&plane], None)?;
//! let mut stream = Cursor::new(Vec::new());
//! pgf.write(&mut stream, None)?;
//!
//! // Decode a quarter-resolution preview (level 1)
//! let mut pgf = PgfImage::new();
//! stream.set_position(0);
//! pgf.open(&mut stream)?;
//! pgf.read(&mut stream, 1, None)?;
//! let planes = pgf.export_channels(None)?;
//! ```
//!
//! # Features
//!
//! - **Progressive**: truncated files decode to smaller images
//! - **Lossless and lossy**: quality 0 round-trips bit-exactly, higher
//!   values discard coefficient bits
//! - **Region of interest**: tile-aligned partial decoding via `PGF_ROI`
//! - **Optional parallelism**: enable the `rayon` feature for per-channel
//!   parallel transforms
//! - **Coefficient width**: 32-bit by default, 16-bit with the `coeff16`
//!   feature (changes the on-disk format)

// Core modules
pub mod codec;
pub mod container;
pub mod geom;
pub mod image;
pub mod stream;
pub mod utils;
pub mod wavelet;

// Wavelet coefficient type. The width is an image-global property recorded
// in the version byte, hence a compile-time choice.
#[cfg(feature = "coeff16")]
pub type Coeff = i16;
#[cfg(not(feature = "coeff16"))]
pub type Coeff = i32;

// Main façade
pub use image::{level_height, level_width, PgfImage};

// Container types
pub use container::header::{
    current_version, Header, ImageMode, RgbQuad, RoiBlockHeader, MAX_CHANNELS, MAX_LEVEL,
    MAX_QUALITY, PGF32, PGF_ROI,
};

// Geometry and transform types
pub use geom::Rect;
pub use stream::PgfStream;
pub use wavelet::{Orientation, RoiIndices, Subband, WaveletTransform};

// Progress reporting
pub use utils::progress::{ProgressFn, ProgressMode};

// Error types
pub use utils::error::{PgfError, Result};

// Constants
pub const PGF_CODEC_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(PGF_CODEC_VERSION, "0.1.0");
    }

    #[test]
    fn test_current_version_flags() {
        let v = current_version();
        assert_ne!(v & container::VERSION2, 0);
        assert_ne!(v & container::VERSION6, 0);
        assert_eq!(v & PGF_ROI, 0);
        #[cfg(not(feature = "coeff16"))]
        assert_ne!(v & PGF32, 0);
        #[cfg(feature = "coeff16")]
        assert_eq!(v & PGF32, 0);
    }

    #[test]
    fn test_public_api_facade_starts_idle() {
        let pgf = PgfImage::new();
        assert!(!pgf.is_open());
        assert_eq!(pgf.level(), 0);
    }
}

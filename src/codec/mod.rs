// src/codec/mod.rs

//! The entropy coding seam.
//!
//! Entropy coding proper is outside the transform core: a level codec only
//! has to turn the subbands belonging to one transform level into payload
//! bytes and back. The bundled [`RawBlockCodec`] stores coefficients
//! verbatim (optionally segmented into ROI tile blocks); a bit-plane
//! entropy coder plugs in behind the same trait.

pub mod raw;

pub use raw::RawBlockCodec;

use crate::utils::error::Result;
use crate::wavelet::WaveletTransform;

/// Byte-oriented per-level codec contract.
///
/// A transform level owns its three detail subbands, plus the LL subband at
/// the deepest level. `encode_level` serializes them for every channel into
/// one payload; `decode_level` must consume exactly the bytes
/// `encode_level` produced and repopulate the same subbands.
pub trait LevelCodec {
    /// Serialize all subbands of `level` across `channels` into payload
    /// bytes. Subband buffers are expected to be quantized already.
    fn encode_level(&self, channels: &mut [WaveletTransform], level: usize) -> Result<Vec<u8>>;

    /// Repopulate the subbands of `level` from payload bytes, undoing the
    /// quantization `quant`.
    fn decode_level(
        &self,
        payload: &[u8],
        channels: &mut [WaveletTransform],
        level: usize,
        quant: u8,
    ) -> Result<()>;
}

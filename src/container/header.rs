// src/container/header.rs

//! PGF bitstream container structures.
//!
//! A PGF file is the concatenation
//! `PreHeader ‖ Header ‖ PostHeader ‖ LengthTable ‖ Level[L-1] ‖ … ‖ Level[0]`
//! with every multi-byte integer stored little-endian and no implicit
//! padding anywhere. The pre-header carries the magic and a version byte
//! made of the flag bits below; `h_size` covers the header and the optional
//! post-header only (the length table is accounted separately).

use crate::stream::PgfStream;
use crate::utils::error::{PgfError, Result};
use crate::Coeff;
use bytemuck::{cast_slice, cast_slice_mut, Pod, Zeroable};

/// PGF identification.
pub const MAGIC: &[u8; 3] = b"PGF";
/// Maximum number of transform levels.
pub const MAX_LEVEL: usize = 30;
/// Number of subbands per level.
pub const N_SUBBANDS: usize = 4;
/// Maximum number of (color) channels.
pub const MAX_CHANNELS: usize = 8;
/// Size of the color lookup table in indexed modes.
pub const COLOR_TABLE_LEN: usize = 256;
/// Maximum number of 32-bit coefficient words in one ROI block.
pub const BUFFER_SIZE: usize = 16384;
/// Bit width of the `buffer_size` field in a [`RoiBlockHeader`].
pub const RL_BLOCK_SIZE_LEN: u32 = 15;

/// Maximum number of magnitude bit planes a coefficient can carry.
#[cfg(feature = "coeff16")]
pub const MAX_BIT_PLANES: u8 = 15;
#[cfg(not(feature = "coeff16"))]
pub const MAX_BIT_PLANES: u8 = 31;
/// Maximum quantization parameter.
pub const MAX_QUALITY: u8 = MAX_BIT_PLANES;

// version flags
/// Header layout of major version 2.
pub const VERSION2: u8 = 2;
/// 32-bit coefficients (up to 31 magnitude bits); unset means 16-bit.
pub const PGF32: u8 = 4;
/// Level payloads are segmented into ROI tile blocks.
pub const PGF_ROI: u8 = 8;
/// Coding scheme of major version 5.
pub const VERSION5: u8 = 16;
/// `h_size` is a u32 (earlier versions stored a u16).
pub const VERSION6: u8 = 32;

const VALID_VERSION_MASK: u8 = VERSION2 | PGF32 | PGF_ROI | VERSION5 | VERSION6;

/// Serialized size of [`Header`] in bytes.
pub const HEADER_SIZE: u32 = 16;
/// Serialized size of the color table in bytes.
pub const COLOR_TABLE_SIZE: u32 = (COLOR_TABLE_LEN * 4) as u32;

/// Version byte of files produced by this build.
pub fn current_version() -> u8 {
    if std::mem::size_of::<Coeff>() == 4 {
        VERSION2 | PGF32 | VERSION5 | VERSION6
    } else {
        VERSION2 | VERSION5 | VERSION6
    }
}

/// Image mode byte, compatible with Adobe's image modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ImageMode {
    Bitmap = 0,
    GrayScale = 1,
    IndexedColor = 2,
    RgbColor = 3,
    CmykColor = 4,
    Gray16 = 10,
    Rgb48 = 11,
    Rgba = 17,
    Gray32 = 18,
    #[default]
    Unknown = 255,
}

impl ImageMode {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => ImageMode::Bitmap,
            1 => ImageMode::GrayScale,
            2 => ImageMode::IndexedColor,
            3 => ImageMode::RgbColor,
            4 => ImageMode::CmykColor,
            10 => ImageMode::Gray16,
            11 => ImageMode::Rgb48,
            17 => ImageMode::Rgba,
            18 => ImageMode::Gray32,
            _ => ImageMode::Unknown,
        }
    }

    /// Default channel count for this mode, used when the caller leaves the
    /// header field zero.
    pub fn default_channels(self) -> u8 {
        match self {
            ImageMode::Bitmap
            | ImageMode::GrayScale
            | ImageMode::IndexedColor
            | ImageMode::Gray16
            | ImageMode::Gray32 => 1,
            ImageMode::RgbColor | ImageMode::Rgb48 => 3,
            ImageMode::CmykColor | ImageMode::Rgba => 4,
            ImageMode::Unknown => 1,
        }
    }

    /// Default bits per pixel for this mode.
    pub fn default_bpp(self) -> u8 {
        match self {
            ImageMode::Bitmap => 1,
            ImageMode::GrayScale | ImageMode::IndexedColor => 8,
            ImageMode::Gray16 => 16,
            ImageMode::Gray32 | ImageMode::Rgba => 32,
            ImageMode::RgbColor => 24,
            ImageMode::Rgb48 => 48,
            ImageMode::CmykColor => 32,
            ImageMode::Unknown => 8,
        }
    }

    /// Indexed modes carry a color table in the post-header.
    pub fn has_color_table(self) -> bool {
        matches!(self, ImageMode::IndexedColor)
    }
}

/// One color table entry (blue, green, red, reserved — RGBQUAD layout).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RgbQuad {
    pub blue: u8,
    pub green: u8,
    pub red: u8,
    pub reserved: u8,
}

/// PGF pre-header: magic, version byte and the byte length of
/// header + post-header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreHeader {
    pub version: u8,
    pub h_size: u32,
}

impl PreHeader {
    pub fn is_32_bit(&self) -> bool {
        self.version & PGF32 != 0
    }

    pub fn roi_supported(&self) -> bool {
        self.version & PGF_ROI != 0
    }

    /// Serialized size: magic + version + h_size (u32 since version 6,
    /// u16 before).
    pub fn size(&self) -> u32 {
        if self.version & VERSION6 != 0 {
            8
        } else {
            6
        }
    }

    pub fn write<S: PgfStream + ?Sized>(&self, stream: &mut S) -> Result<()> {
        stream.write_all(MAGIC)?;
        stream.write_u8(self.version)?;
        if self.version & VERSION6 != 0 {
            stream.write_u32(self.h_size)?;
        } else {
            stream.write_u16(self.h_size as u16)?;
        }
        Ok(())
    }

    /// Reads and validates magic and version. The coefficient width flag
    /// must match the build, since `Coeff` is fixed at compile time.
    pub fn read<S: PgfStream + ?Sized>(stream: &mut S) -> Result<Self> {
        let mut magic = [0u8; 3];
        stream.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(PgfError::Format("not a PGF stream (bad magic)".into()));
        }
        let version = stream.read_u8()?;
        if version & VERSION2 == 0 {
            return Err(PgfError::Format(format!(
                "unsupported codec version byte 0x{version:02X}"
            )));
        }
        if version & !VALID_VERSION_MASK != 0 {
            return Err(PgfError::Format(format!(
                "unknown version flags in 0x{version:02X}"
            )));
        }
        let file_is_32 = version & PGF32 != 0;
        let build_is_32 = std::mem::size_of::<Coeff>() == 4;
        if file_is_32 != build_is_32 {
            return Err(PgfError::Format(format!(
                "file uses {}-bit coefficients, this build decodes {}-bit",
                if file_is_32 { 32 } else { 16 },
                if build_is_32 { 32 } else { 16 },
            )));
        }
        let h_size = if version & VERSION6 != 0 {
            stream.read_u32()?
        } else {
            u32::from(stream.read_u16()?)
        };
        Ok(PreHeader { version, h_size })
    }
}

/// PGF file header: image geometry and coding parameters. 16 bytes packed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Number of transform levels (= number of level payloads).
    pub n_levels: u8,
    /// Quantization parameter: 0 = lossless.
    pub quality: u8,
    /// Bits per pixel.
    pub bpp: u8,
    /// Number of channels.
    pub channels: u8,
    /// Image mode byte (see [`ImageMode`]).
    pub mode: ImageMode,
    /// Number of used bits per channel in 16- and 32-bit channel modes.
    pub used_bits_per_channel: u8,
}

impl Header {
    pub fn write<S: PgfStream + ?Sized>(&self, stream: &mut S) -> Result<()> {
        stream.write_u32(self.width)?;
        stream.write_u32(self.height)?;
        stream.write_u8(self.n_levels)?;
        stream.write_u8(self.quality)?;
        stream.write_u8(self.bpp)?;
        stream.write_u8(self.channels)?;
        stream.write_u8(self.mode as u8)?;
        stream.write_u8(self.used_bits_per_channel)?;
        stream.write_u16(0)?; // reserved
        Ok(())
    }

    pub fn read<S: PgfStream + ?Sized>(stream: &mut S) -> Result<Self> {
        let width = stream.read_u32()?;
        let height = stream.read_u32()?;
        let n_levels = stream.read_u8()?;
        let quality = stream.read_u8()?;
        let bpp = stream.read_u8()?;
        let channels = stream.read_u8()?;
        let mode = ImageMode::from_u8(stream.read_u8()?);
        let used_bits_per_channel = stream.read_u8()?;
        let _reserved = stream.read_u16()?;

        if width == 0 || height == 0 {
            return Err(PgfError::Format(format!(
                "degenerate image dimensions {width}x{height}"
            )));
        }
        if n_levels == 0 || n_levels as usize > MAX_LEVEL {
            return Err(PgfError::Format(format!(
                "level count {n_levels} outside [1, {MAX_LEVEL}]"
            )));
        }
        if channels == 0 || channels as usize > MAX_CHANNELS {
            return Err(PgfError::Format(format!(
                "channel count {channels} outside [1, {MAX_CHANNELS}]"
            )));
        }
        if quality > MAX_QUALITY {
            return Err(PgfError::Format(format!(
                "quality {quality} exceeds {MAX_QUALITY}"
            )));
        }

        Ok(Header {
            width,
            height,
            n_levels,
            quality,
            bpp,
            channels,
            mode,
            used_bits_per_channel,
        })
    }
}

/// Optional post-header: color table for indexed modes and opaque user data.
#[derive(Debug, Clone, Default)]
pub struct PostHeader {
    pub clut: Option<Box<[RgbQuad; COLOR_TABLE_LEN]>>,
    pub user_data: Vec<u8>,
}

impl PostHeader {
    /// Serialized size in bytes. User data is prefixed with its u32 length
    /// when present.
    pub fn size(&self) -> u32 {
        let mut size = 0;
        if self.clut.is_some() {
            size += COLOR_TABLE_SIZE;
        }
        if !self.user_data.is_empty() {
            size += 4 + self.user_data.len() as u32;
        }
        size
    }

    pub fn write<S: PgfStream + ?Sized>(&self, stream: &mut S) -> Result<()> {
        if let Some(clut) = &self.clut {
            stream.write_all(cast_slice(clut.as_slice()))?;
        }
        if !self.user_data.is_empty() {
            stream.write_u32(self.user_data.len() as u32)?;
            stream.write_all(&self.user_data)?;
        }
        Ok(())
    }

    /// Reads the post-header given the byte count `h_size` reserves for it.
    /// Returns the post-header and, when user data is present, its stream
    /// position. With `skip_user_data` the bytes are seeked over instead of
    /// kept in memory.
    pub fn read<S: PgfStream + ?Sized>(
        stream: &mut S,
        mode: ImageMode,
        remaining: u32,
        skip_user_data: bool,
    ) -> Result<(Self, Option<u64>)> {
        let mut post = PostHeader::default();
        let mut remaining = remaining;

        if mode.has_color_table() {
            if remaining < COLOR_TABLE_SIZE {
                return Err(PgfError::Format(
                    "header size too small for a color table".into(),
                ));
            }
            let mut clut = Box::new([RgbQuad::default(); COLOR_TABLE_LEN]);
            stream.read_exact(cast_slice_mut(clut.as_mut_slice()))?;
            post.clut = Some(clut);
            remaining -= COLOR_TABLE_SIZE;
        }

        let mut user_data_pos = None;
        if remaining > 0 {
            if remaining < 4 {
                return Err(PgfError::Format("truncated user data length".into()));
            }
            let len = stream.read_u32()?;
            if len != remaining - 4 {
                return Err(PgfError::Format(format!(
                    "user data length {len} disagrees with header size"
                )));
            }
            user_data_pos = Some(stream.tell()?);
            if skip_user_data {
                stream.seek(std::io::SeekFrom::Current(i64::from(len)))?;
            } else {
                let mut data = vec![0u8; len as usize];
                stream.read_exact(&mut data)?;
                post.user_data = data;
            }
        }

        Ok((post, user_data_pos))
    }
}

/// Block header used with the ROI coding scheme: a 16-bit unit whose low 15
/// bits count the uncoded 32-bit coefficient words in the block and whose
/// most significant bit marks the last block of a tile.
///
/// C implementations declare this as a bitfield whose member order flips on
/// big-endian compilers; both declarations produce the same bytes on disk,
/// so a single little-endian u16 layout covers every build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiBlockHeader {
    /// Number of 32-bit coefficient words in the block, `< 2^15`.
    pub buffer_size: u16,
    /// Set on the last block of a tile.
    pub tile_end: bool,
}

impl RoiBlockHeader {
    pub fn new(buffer_size: usize, tile_end: bool) -> Self {
        debug_assert!(buffer_size < (1 << RL_BLOCK_SIZE_LEN));
        RoiBlockHeader {
            buffer_size: buffer_size as u16,
            tile_end,
        }
    }

    pub fn to_u16(self) -> u16 {
        self.buffer_size | u16::from(self.tile_end) << RL_BLOCK_SIZE_LEN
    }

    pub fn from_u16(v: u16) -> Self {
        RoiBlockHeader {
            buffer_size: v & ((1 << RL_BLOCK_SIZE_LEN) - 1),
            tile_end: v >> RL_BLOCK_SIZE_LEN != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pre_header_round_trip() {
        let pre = PreHeader {
            version: current_version(),
            h_size: HEADER_SIZE,
        };
        let mut s = Cursor::new(Vec::new());
        pre.write(&mut s).unwrap();
        assert_eq!(s.get_ref().len(), 8);
        assert_eq!(&s.get_ref()[..3], b"PGF");
        s.set_pos(0).unwrap();
        assert_eq!(PreHeader::read(&mut s).unwrap(), pre);
    }

    #[test]
    fn test_pre_header_rejects_bad_magic() {
        let mut s = Cursor::new(b"PNG\x36\x10\x00\x00\x00".to_vec());
        assert!(matches!(
            PreHeader::read(&mut s),
            Err(PgfError::Format(_))
        ));
    }

    #[test]
    fn test_pre_header_rejects_version_zero() {
        let mut s = Cursor::new(b"PGF\x00\x10\x00".to_vec());
        assert!(matches!(
            PreHeader::read(&mut s),
            Err(PgfError::Format(_))
        ));
    }

    #[test]
    fn test_header_round_trip() {
        let header = Header {
            width: 640,
            height: 480,
            n_levels: 5,
            quality: 2,
            bpp: 24,
            channels: 3,
            mode: ImageMode::RgbColor,
            used_bits_per_channel: 8,
        };
        let mut s = Cursor::new(Vec::new());
        header.write(&mut s).unwrap();
        assert_eq!(s.get_ref().len() as u32, HEADER_SIZE);
        s.set_pos(0).unwrap();
        assert_eq!(Header::read(&mut s).unwrap(), header);
    }

    #[test]
    fn test_header_rejects_zero_levels() {
        let header = Header {
            width: 8,
            height: 8,
            n_levels: 0,
            channels: 1,
            ..Header::default()
        };
        let mut s = Cursor::new(Vec::new());
        header.write(&mut s).unwrap();
        s.set_pos(0).unwrap();
        assert!(matches!(Header::read(&mut s), Err(PgfError::Format(_))));
    }

    #[test]
    fn test_post_header_user_data_round_trip() {
        let post = PostHeader {
            clut: None,
            user_data: b"exif goes here".to_vec(),
        };
        let mut s = Cursor::new(Vec::new());
        post.write(&mut s).unwrap();
        assert_eq!(s.get_ref().len() as u32, post.size());
        s.set_pos(0).unwrap();
        let (read, pos) =
            PostHeader::read(&mut s, ImageMode::GrayScale, post.size(), false).unwrap();
        assert_eq!(read.user_data, post.user_data);
        assert_eq!(pos, Some(4));
    }

    #[test]
    fn test_roi_block_header_bit_layout() {
        let h = RoiBlockHeader::new(0x1234, true);
        assert_eq!(h.to_u16(), 0x9234);
        assert_eq!(RoiBlockHeader::from_u16(0x9234), h);
        let h = RoiBlockHeader::new(3, false);
        assert_eq!(h.to_u16(), 3);
        assert!(!RoiBlockHeader::from_u16(3).tile_end);
    }
}

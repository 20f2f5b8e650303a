// src/image/mod.rs

//! The PGF image façade.
//!
//! One `PgfImage` drives a whole encode or decode:
//!
//! Encoding:
//! ```ignore
//! let mut pgf = PgfImage::new();
//! pgf.set_header(header, 0, Vec::new())?;
//! pgf.import_channels(&[&plane], None)?;
//! pgf.write(&mut stream, None)?;
//! ```
//!
//! Decoding:
//! ```ignore
//! let mut pgf = PgfImage::new();
//! pgf.open(&mut stream)?;
//! pgf.read(&mut stream, 0, None)?;
//! let planes = pgf.export_channels(None)?;
//! ```
//!
//! Reading stops at any level: after `read(k)` the reconstruction has
//! dimensions `ceil(W / 2^k) x ceil(H / 2^k)`.

use crate::codec::{LevelCodec, RawBlockCodec};
use crate::container::header::{
    current_version, Header, PostHeader, PreHeader, RgbQuad, COLOR_TABLE_LEN, HEADER_SIZE,
    MAX_CHANNELS, MAX_LEVEL, MAX_QUALITY, PGF_ROI,
};
use crate::geom::Rect;
use crate::stream::PgfStream;
use crate::utils::error::{PgfError, Result};
use crate::utils::progress::{Progress, ProgressFn, ProgressMode};
use crate::wavelet::{Orientation, WaveletTransform, FILTER_HEIGHT, FILTER_WIDTH};
use crate::Coeff;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Encoding { header_written: bool },
    Decoding,
}

/// Progressive image codec façade. Owns one transform pyramid per channel.
pub struct PgfImage {
    pre_header: PreHeader,
    header: Header,
    post_header: PostHeader,
    /// Payload byte length per level, index 0 = finest.
    level_length: Vec<u32>,
    channels: Vec<WaveletTransform>,
    /// Imported channel planes awaiting `write_header`.
    planes: Vec<Vec<Coeff>>,
    /// Coarsest level not yet decoded; `n_levels` right after `open`.
    current_level: usize,
    state: State,

    // decode-side stream bookkeeping
    user_data_pos: Option<u64>,
    stream_len: u64,
    data_start: u64,
    // encode-side position of the reserved length table
    table_pos: u64,

    use_parallel_encoder: bool,
    use_parallel_decoder: bool,
    favor_speed_over_size: bool,
    skip_user_data: bool,
    progress_mode: ProgressMode,
}

impl Default for PgfImage {
    fn default() -> Self {
        Self::new()
    }
}

impl PgfImage {
    pub fn new() -> Self {
        PgfImage {
            pre_header: PreHeader::default(),
            header: Header::default(),
            post_header: PostHeader::default(),
            level_length: Vec::new(),
            channels: Vec::new(),
            planes: Vec::new(),
            current_level: 0,
            state: State::Idle,
            user_data_pos: None,
            stream_len: 0,
            data_start: 0,
            table_pos: 0,
            use_parallel_encoder: true,
            use_parallel_decoder: true,
            favor_speed_over_size: false,
            skip_user_data: false,
            progress_mode: ProgressMode::default(),
        }
    }

    // ------------------------------------------------------------------
    // configuration

    /// Configure the encoder. Channel-level parallelism takes effect with
    /// the `rayon` feature; `favor_speed_over_size` is forwarded to codecs
    /// that trade compression for speed.
    pub fn configure_encoder(&mut self, use_parallel: bool, favor_speed_over_size: bool) {
        self.use_parallel_encoder = use_parallel;
        self.favor_speed_over_size = favor_speed_over_size;
    }

    /// Configure the decoder. With `skip_user_data`, metadata bytes are
    /// seeked over during `open` instead of kept in memory.
    pub fn configure_decoder(&mut self, use_parallel: bool, skip_user_data: bool) {
        self.use_parallel_decoder = use_parallel;
        self.skip_user_data = skip_user_data;
    }

    /// Set how the progress callback percentage is computed. Call before
    /// `open` or `set_header`.
    pub fn set_progress_mode(&mut self, mode: ProgressMode) {
        self.progress_mode = mode;
    }

    // ------------------------------------------------------------------
    // encoding

    /// Set the file header and optional user data (metadata). Zero header
    /// fields are completed from the image mode; a zero level count selects
    /// an automatic value. Pass `PGF_ROI` in `flags` to emit the ROI
    /// tile-block scheme.
    pub fn set_header(&mut self, mut header: Header, flags: u8, user_data: Vec<u8>) -> Result<()> {
        if self.state != State::Idle {
            return Err(PgfError::AlreadyOpen);
        }
        if header.width == 0 || header.height == 0 {
            return Err(PgfError::InvalidArg(format!(
                "degenerate image dimensions {}x{}",
                header.width, header.height
            )));
        }

        if header.channels == 0 {
            header.channels = header.mode.default_channels();
        }
        if header.channels as usize > MAX_CHANNELS {
            return Err(PgfError::InvalidArg(format!(
                "channel count {} exceeds {MAX_CHANNELS}",
                header.channels
            )));
        }
        if header.bpp == 0 {
            header.bpp = header.mode.default_bpp();
        }
        if header.used_bits_per_channel == 0 {
            header.used_bits_per_channel = (header.bpp / header.channels).min(crate::container::MAX_BIT_PLANES);
        }
        header.quality = header.quality.min(MAX_QUALITY);
        header.n_levels = compute_levels(header.width, header.height, header.n_levels);

        self.pre_header = PreHeader {
            version: current_version() | (flags & PGF_ROI),
            h_size: 0, // finalized in write_header
        };
        self.post_header = PostHeader {
            clut: header
                .mode
                .has_color_table()
                .then(|| Box::new([RgbQuad::default(); COLOR_TABLE_LEN])),
            user_data,
        };
        self.level_length = vec![0; header.n_levels as usize];
        self.header = header;
        self.state = State::Encoding {
            header_written: false,
        };
        debug!(
            width = header.width,
            height = header.height,
            levels = header.n_levels,
            quality = header.quality,
            "header set"
        );
        Ok(())
    }

    /// Import one coefficient plane per channel. `channel_map[c]` names the
    /// input plane feeding codec channel `c`; `None` is the identity.
    /// Color transforms happen outside the codec: planes arrive in the
    /// channel space that will be encoded.
    pub fn import_channels(
        &mut self,
        planes: &[&[Coeff]],
        channel_map: Option<&[usize]>,
    ) -> Result<()> {
        let State::Encoding { .. } = self.state else {
            return Err(PgfError::NotOpen);
        };
        let n = self.header.channels as usize;
        if planes.len() != n {
            return Err(PgfError::InvalidArg(format!(
                "{} planes supplied, header names {n} channels",
                planes.len()
            )));
        }
        let map = validate_channel_map(channel_map, n)?;
        let len = self.header.width as usize * self.header.height as usize;
        let mut imported = Vec::with_capacity(n);
        for c in 0..n {
            let src = planes[map[c]];
            if src.len() != len {
                return Err(PgfError::InvalidArg(format!(
                    "plane {} holds {} samples, image needs {len}",
                    map[c],
                    src.len()
                )));
            }
            imported.push(src.to_vec());
        }
        self.planes = imported;
        Ok(())
    }

    /// Encode and write the whole image. Returns the number of bytes
    /// written.
    pub fn write<S: PgfStream + ?Sized>(
        &mut self,
        stream: &mut S,
        cb: Option<ProgressFn>,
    ) -> Result<u64> {
        let header_bytes = self.write_header(stream)?;
        let image_bytes = self.write_image(stream, cb)?;
        Ok(header_bytes + image_bytes)
    }

    /// Build the transform pyramids, run the full forward decomposition and
    /// write pre-header, header, post-header and the (still blank) length
    /// table. Callers wanting uncached metadata at a known offset invoke
    /// this and `write_image` separately.
    pub fn write_header<S: PgfStream + ?Sized>(&mut self, stream: &mut S) -> Result<u64> {
        match self.state {
            State::Encoding {
                header_written: false,
            } => {}
            State::Encoding {
                header_written: true,
            } => return Err(PgfError::AlreadyOpen),
            _ => return Err(PgfError::NotOpen),
        }
        if self.planes.is_empty() {
            return Err(PgfError::NotOpen);
        }

        let levels = self.header.n_levels as usize;
        let quant = self.header.quality;
        let (width, height) = (self.header.width, self.header.height);
        let roi = self.pre_header.roi_supported();

        let planes = std::mem::take(&mut self.planes);
        let mut channels = Vec::with_capacity(planes.len());
        for plane in planes {
            let mut transform = WaveletTransform::new(width, height, levels, Some(plane))?;
            if roi {
                transform.set_roi(Rect::new(0, 0, width, height));
            }
            channels.push(transform);
        }
        for_each_channel(&mut channels, self.use_parallel_encoder, |transform| {
            for level in 0..levels {
                transform.forward(level, quant)?;
            }
            Ok(())
        })?;
        self.channels = channels;

        let begin = stream.tell()?;
        self.pre_header.h_size = HEADER_SIZE + self.post_header.size();
        self.pre_header.write(stream)?;
        self.header.write(stream)?;
        self.post_header.write(stream)?;
        self.table_pos = stream.tell()?;
        stream.write_u32_slice(&vec![0u32; levels])?;
        self.state = State::Encoding {
            header_written: true,
        };
        Ok(stream.tell()? - begin)
    }

    /// Emit the level payloads coarsest-first, then backfill the length
    /// table. A progress callback returning `true` stops after the current
    /// level; the table then reflects exactly what was written.
    pub fn write_image<S: PgfStream + ?Sized>(
        &mut self,
        stream: &mut S,
        mut cb: Option<ProgressFn>,
    ) -> Result<u64> {
        if self.state
            != (State::Encoding {
                header_written: true,
            })
        {
            return Err(PgfError::NotOpen);
        }

        let levels = self.header.n_levels as usize;
        let codec = RawBlockCodec::new(self.pre_header.roi_supported());
        let progress = Progress::new(self.progress_mode, levels, levels, 0);
        let begin = stream.tell()?;

        for payload_level in (0..levels).rev() {
            let transform_level = payload_level + 1;
            let payload = codec.encode_level(&mut self.channels, transform_level)?;
            stream.write_all(&payload)?;
            self.level_length[payload_level] = payload.len() as u32;
            for transform in &mut self.channels {
                for band in transform.level_bands_mut(transform_level).iter_mut() {
                    band.free_buffer();
                }
            }
            debug!(
                level = payload_level,
                bytes = payload.len(),
                "level payload written"
            );
            if let Some(cb) = cb.as_mut() {
                if cb(progress.fraction(payload_level)) {
                    break;
                }
            }
        }

        let end = stream.tell()?;
        stream.set_pos(self.table_pos)?;
        stream.write_u32_slice(&self.level_length)?;
        stream.set_pos(end)?;
        Ok(end - begin)
    }

    // ------------------------------------------------------------------
    // decoding

    /// Read pre-header, header, post-header and the length table, leaving
    /// the stream at the first (coarsest) level payload.
    pub fn open<S: PgfStream + ?Sized>(&mut self, stream: &mut S) -> Result<()> {
        if self.state != State::Idle {
            return Err(PgfError::AlreadyOpen);
        }

        let total = stream.stream_length()?;
        self.pre_header = PreHeader::read(stream)?;
        let after_pre = stream.tell()?;
        if u64::from(self.pre_header.h_size) > total.saturating_sub(after_pre) {
            return Err(PgfError::Format(
                "header size exceeds the stream remainder".into(),
            ));
        }
        if self.pre_header.h_size < HEADER_SIZE {
            return Err(PgfError::Format(format!(
                "header size {} below the fixed header length",
                self.pre_header.h_size
            )));
        }

        self.header = Header::read(stream)?;
        let post_len = self.pre_header.h_size - HEADER_SIZE;
        let (post, user_data_pos) =
            PostHeader::read(stream, self.header.mode, post_len, self.skip_user_data)?;
        self.post_header = post;
        self.user_data_pos = user_data_pos;

        let levels = self.header.n_levels as usize;
        let table_pos = stream.tell()?;
        if total.saturating_sub(table_pos) < 4 * levels as u64 {
            return Err(PgfError::Format("truncated level length table".into()));
        }
        let lengths = stream.read_u32_slice(levels)?;
        self.data_start = stream.tell()?;

        // A shorter stream is a legally truncated progressive file; a
        // longer one disagrees with its own directory.
        let sum: u64 = lengths.iter().map(|&l| u64::from(l)).sum();
        if self.data_start + sum < total {
            return Err(PgfError::Format(
                "stream is longer than the length table accounts for".into(),
            ));
        }
        self.level_length = lengths;
        self.stream_len = total;

        let mut channels = Vec::with_capacity(self.header.channels as usize);
        for _ in 0..self.header.channels {
            channels.push(WaveletTransform::new(
                self.header.width,
                self.header.height,
                levels,
                None,
            )?);
        }
        self.channels = channels;
        self.current_level = levels;
        self.state = State::Decoding;
        debug!(
            width = self.header.width,
            height = self.header.height,
            levels = self.header.n_levels,
            version = self.pre_header.version,
            "opened"
        );
        Ok(())
    }

    /// Decode level payloads down to `level` (0 = full resolution). Only
    /// valid for `level <= current_level`; the current level decreases
    /// monotonically across calls.
    pub fn read<S: PgfStream + ?Sized>(
        &mut self,
        stream: &mut S,
        level: usize,
        cb: Option<ProgressFn>,
    ) -> Result<()> {
        self.read_internal(stream, level, None, cb)
    }

    /// Decode a rectangular region of interest down to `level`. The file
    /// must have been encoded with the ROI scheme, and the region must be
    /// chosen before the first payload is decoded.
    pub fn read_roi<S: PgfStream + ?Sized>(
        &mut self,
        stream: &mut S,
        rect: Rect,
        level: usize,
        cb: Option<ProgressFn>,
    ) -> Result<()> {
        if self.state == State::Decoding && !self.pre_header.roi_supported() {
            return Err(PgfError::InvalidArg(
                "file was not encoded with the ROI scheme".into(),
            ));
        }
        self.read_internal(stream, level, Some(rect), cb)
    }

    fn read_internal<S: PgfStream + ?Sized>(
        &mut self,
        stream: &mut S,
        level: usize,
        roi: Option<Rect>,
        mut cb: Option<ProgressFn>,
    ) -> Result<()> {
        if self.state != State::Decoding {
            return Err(PgfError::NotOpen);
        }
        let levels = self.header.n_levels as usize;
        if level >= levels {
            return Err(PgfError::InvalidArg(format!(
                "level {level} outside [0, {levels})"
            )));
        }
        if level > self.current_level {
            return Err(PgfError::InvalidArg(format!(
                "level {} already decoded past {level}",
                self.current_level
            )));
        }

        if self.current_level == levels {
            // region setup happens before the first payload
            if self.pre_header.roi_supported() {
                let rect = match roi {
                    Some(r) => self.clip_roi(r)?,
                    None => Rect::new(0, 0, self.header.width, self.header.height),
                };
                for transform in &mut self.channels {
                    transform.set_roi(rect);
                }
            }
        } else if roi.is_some() {
            return Err(PgfError::InvalidArg(
                "ROI must be chosen before the first read".into(),
            ));
        }

        let codec = RawBlockCodec::new(self.pre_header.roi_supported());
        let progress = Progress::new(self.progress_mode, levels, self.current_level, level);

        while self.current_level > level {
            let payload_level = self.current_level - 1;
            let len = u64::from(self.level_length[payload_level]);
            let offset = self.data_start
                + self.level_length[payload_level + 1..]
                    .iter()
                    .map(|&l| u64::from(l))
                    .sum::<u64>();
            if offset + len > self.stream_len {
                return Err(PgfError::Format(format!(
                    "level {payload_level} payload extends past the end of the stream"
                )));
            }
            stream.set_pos(offset)?;
            let mut payload = vec![0u8; len as usize];
            stream.read_exact(&mut payload)?;

            let transform_level = self.current_level;
            codec.decode_level(
                &payload,
                &mut self.channels,
                transform_level,
                self.header.quality,
            )?;
            for_each_channel(&mut self.channels, self.use_parallel_decoder, |transform| {
                transform.inverse(transform_level)
            })?;
            self.current_level -= 1;
            debug!(level = self.current_level, "level decoded");

            if let Some(cb) = cb.as_mut() {
                if cb(progress.fraction(self.current_level)) {
                    break;
                }
            }
        }
        Ok(())
    }

    fn clip_roi(&self, rect: Rect) -> Result<Rect> {
        let mut r = rect;
        r.right = r.right.min(self.header.width);
        r.bottom = r.bottom.min(self.header.height);
        if r.left >= self.header.width || r.top >= self.header.height || r.is_empty() {
            return Err(PgfError::InvalidArg(format!(
                "ROI ({},{})-({},{}) not inside the {}x{} image",
                rect.left, rect.top, rect.right, rect.bottom, self.header.width, self.header.height
            )));
        }
        Ok(r)
    }

    // ------------------------------------------------------------------
    // extraction and accessors

    /// Reconstructed coefficients of channel `c` at the current level.
    pub fn channel(&self, c: usize) -> Result<&[Coeff]> {
        if self.state != State::Decoding {
            return Err(PgfError::NotOpen);
        }
        let transform = self
            .channels
            .get(c)
            .ok_or_else(|| PgfError::InvalidArg(format!("channel {c} out of range")))?;
        Ok(transform.band(self.current_level, Orientation::Ll).buffer())
    }

    /// Width of channel `c` at the current level; reflects both the levels
    /// read so far and any ROI.
    pub fn channel_width(&self, c: usize) -> u32 {
        self.channels[c]
            .band(self.current_level, Orientation::Ll)
            .roi()
            .width()
    }

    /// Height of channel `c` at the current level.
    pub fn channel_height(&self, c: usize) -> u32 {
        self.channels[c]
            .band(self.current_level, Orientation::Ll)
            .roi()
            .height()
    }

    /// Copy out all channels; `channel_map[c]` names the output slot that
    /// receives codec channel `c`.
    pub fn export_channels(&self, channel_map: Option<&[usize]>) -> Result<Vec<Vec<Coeff>>> {
        let n = self.header.channels as usize;
        let map = validate_channel_map(channel_map, n)?;
        let mut out = vec![Vec::new(); n];
        for c in 0..n {
            out[map[c]] = self.channel(c)?.to_vec();
        }
        Ok(out)
    }

    pub fn is_open(&self) -> bool {
        self.state == State::Decoding
    }

    /// Reset to the initial state, releasing pyramids and buffers.
    /// Configuration survives.
    pub fn close(&mut self) {
        self.channels.clear();
        self.planes.clear();
        self.level_length.clear();
        self.pre_header = PreHeader::default();
        self.header = Header::default();
        self.post_header = PostHeader::default();
        self.current_level = 0;
        self.user_data_pos = None;
        self.stream_len = 0;
        self.data_start = 0;
        self.table_pos = 0;
        self.state = State::Idle;
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Version byte of the opened or configured image.
    pub fn version(&self) -> u8 {
        self.pre_header.version
    }

    /// Number of levels (= level payloads) of the image.
    pub fn levels(&self) -> u8 {
        self.header.n_levels
    }

    /// Coarsest level not yet decoded; equals `levels()` right after
    /// `open`.
    pub fn level(&self) -> usize {
        self.current_level
    }

    pub fn quality(&self) -> u8 {
        self.header.quality
    }

    /// Image width at `level`, independent of reads and ROI.
    pub fn width(&self, level: usize) -> u32 {
        level_width(self.header.width, level)
    }

    /// Image height at `level`, independent of reads and ROI.
    pub fn height(&self, level: usize) -> u32 {
        level_height(self.header.height, level)
    }

    /// Whether the encoder was asked to favor speed over compression
    /// ratio; consumed by codecs that have the trade-off to make.
    pub fn favors_speed_over_size(&self) -> bool {
        self.favor_speed_over_size
    }

    /// Byte length of the encoded payload of `level`.
    pub fn encoded_level_length(&self, level: usize) -> Result<u32> {
        self.level_length
            .get(level)
            .copied()
            .ok_or_else(|| PgfError::InvalidArg(format!("level {level} out of range")))
    }

    /// User data (metadata) carried by the post-header.
    pub fn user_data(&self) -> &[u8] {
        &self.post_header.user_data
    }

    /// Stream position of the user data, when the file carries any.
    pub fn user_data_pos(&self) -> Option<u64> {
        self.user_data_pos
    }

    /// Tile-index rectangle of the ROI at `level`, available once a region
    /// has been chosen.
    pub fn tile_indices(&self, level: usize) -> Option<Rect> {
        self.channels
            .first()
            .and_then(|t| t.roi_indices())
            .map(|indices| *indices.indices(level))
    }

    /// Fill a range of color table entries (indexed modes).
    pub fn set_color_table(&mut self, first: usize, colors: &[RgbQuad]) -> Result<()> {
        let Some(clut) = self.post_header.clut.as_mut() else {
            return Err(PgfError::InvalidArg(
                "image mode carries no color table".into(),
            ));
        };
        if first + colors.len() > COLOR_TABLE_LEN {
            return Err(PgfError::InvalidArg(format!(
                "color table range {first}..{} out of bounds",
                first + colors.len()
            )));
        }
        clut[first..first + colors.len()].copy_from_slice(colors);
        Ok(())
    }

    pub fn color_table(&self) -> Option<&[RgbQuad]> {
        self.post_header.clut.as_deref().map(|c| c.as_slice())
    }
}

/// Image width at `level`: `ceil(width / 2^level)`.
pub fn level_width(width: u32, level: usize) -> u32 {
    debug_assert!(level <= MAX_LEVEL);
    let w = width >> level;
    if (w << level) == width {
        w
    } else {
        w + 1
    }
}

/// Image height at `level`: `ceil(height / 2^level)`.
pub fn level_height(height: u32, level: usize) -> u32 {
    level_width(height, level)
}

/// Level count policy: zero requests the automatic value (grow until the
/// coarsest side fits a thumbnail, then stay above the filter support);
/// explicit requests are clamped into `[1, MAX_LEVEL]`.
fn compute_levels(width: u32, height: u32, requested: u8) -> u8 {
    const MAX_THUMBNAIL: u32 = 20 * FILTER_WIDTH;
    if requested >= 1 {
        return requested.min(MAX_LEVEL as u8);
    }

    let m = width.min(height);
    let mut levels: u8 = 1;
    let mut s = m;
    while s > MAX_THUMBNAIL {
        levels += 1;
        s >>= 1;
    }
    let filter = FILTER_WIDTH.max(FILTER_HEIGHT);
    while levels > 1 && m < filter << levels {
        levels -= 1;
    }
    levels
}

fn validate_channel_map(channel_map: Option<&[usize]>, n: usize) -> Result<Vec<usize>> {
    match channel_map {
        None => Ok((0..n).collect()),
        Some(map) => {
            if map.len() != n {
                return Err(PgfError::InvalidArg(format!(
                    "channel map holds {} entries, image has {n} channels",
                    map.len()
                )));
            }
            let mut seen = vec![false; n];
            for &m in map {
                if m >= n || seen[m] {
                    return Err(PgfError::InvalidArg(format!(
                        "channel map entry {m} out of range or repeated"
                    )));
                }
                seen[m] = true;
            }
            Ok(map.to_vec())
        }
    }
}

fn for_each_channel<F>(channels: &mut [WaveletTransform], parallel: bool, f: F) -> Result<()>
where
    F: Fn(&mut WaveletTransform) -> Result<()> + Sync,
{
    #[cfg(feature = "rayon")]
    if parallel && channels.len() > 1 {
        use rayon::prelude::*;
        return channels.par_iter_mut().try_for_each(&f);
    }
    let _ = parallel;
    channels.iter_mut().try_for_each(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_width_is_ceil_shift() {
        assert_eq!(level_width(100, 0), 100);
        assert_eq!(level_width(100, 1), 50);
        assert_eq!(level_width(100, 2), 25);
        assert_eq!(level_width(100, 3), 13);
        assert_eq!(level_width(1, 5), 1);
        assert_eq!(level_height(17, 1), 9);
    }

    #[test]
    fn test_compute_levels_auto() {
        assert_eq!(compute_levels(1, 1, 0), 1);
        assert_eq!(compute_levels(100, 100, 0), 1);
        assert_eq!(compute_levels(256, 256, 0), 3);
        assert_eq!(compute_levels(4000, 3000, 0), 6);
    }

    #[test]
    fn test_compute_levels_explicit_is_honored() {
        assert_eq!(compute_levels(16, 16, 3), 3);
        assert_eq!(compute_levels(100, 100, 4), 4);
        assert_eq!(compute_levels(8, 8, 200), MAX_LEVEL as u8);
    }

    #[test]
    fn test_channel_map_validation() {
        assert_eq!(validate_channel_map(None, 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(
            validate_channel_map(Some(&[2, 0, 1]), 3).unwrap(),
            vec![2, 0, 1]
        );
        assert!(validate_channel_map(Some(&[0, 1]), 3).is_err());
        assert!(validate_channel_map(Some(&[0, 0, 1]), 3).is_err());
        assert!(validate_channel_map(Some(&[0, 1, 3]), 3).is_err());
    }

    #[test]
    fn test_state_machine_guards() {
        let mut pgf = PgfImage::new();
        let mut stream = std::io::Cursor::new(Vec::new());
        assert!(matches!(
            pgf.read(&mut stream, 0, None),
            Err(PgfError::NotOpen)
        ));
        assert!(matches!(
            pgf.import_channels(&[&[0][..]], None),
            Err(PgfError::NotOpen)
        ));

        let header = Header {
            width: 4,
            height: 4,
            channels: 1,
            mode: crate::container::ImageMode::GrayScale,
            ..Header::default()
        };
        pgf.set_header(header, 0, Vec::new()).unwrap();
        assert!(matches!(
            pgf.set_header(header, 0, Vec::new()),
            Err(PgfError::AlreadyOpen)
        ));
        // write without import
        assert!(matches!(
            pgf.write(&mut stream, None),
            Err(PgfError::NotOpen)
        ));
    }
}

// src/codec/raw.rs

//! Transparent level codec: coefficients are stored as little-endian 32-bit
//! words. In ROI mode every subband is segmented into tile blocks framed by
//! [`RoiBlockHeader`] so a decoder can skip tiles outside its region of
//! interest without decoding them.

use crate::codec::LevelCodec;
use crate::container::header::{RoiBlockHeader, BUFFER_SIZE};
use crate::geom::Rect;
use crate::stream::LeI32;
use crate::utils::error::{PgfError, Result};
use crate::wavelet::{Orientation, Subband, WaveletTransform};
use crate::Coeff;
use bytemuck::cast_slice;

/// Level codec storing coefficients verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBlockCodec {
    /// Segment subbands into ROI tile blocks (the `PGF_ROI` scheme).
    pub roi: bool,
}

impl RawBlockCodec {
    pub fn new(roi: bool) -> Self {
        RawBlockCodec { roi }
    }
}

/// Subbands carried by a level payload: the deepest level also includes LL.
fn payload_orientations(top: bool) -> &'static [Orientation] {
    if top {
        &Orientation::ALL
    } else {
        &Orientation::ALL[1..]
    }
}

impl LevelCodec for RawBlockCodec {
    fn encode_level(&self, channels: &mut [WaveletTransform], level: usize) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        for transform in channels.iter_mut() {
            let top = level == transform.n_levels() - 1;
            for &orientation in payload_orientations(top) {
                let band = transform.band_mut(level, orientation);
                if self.roi {
                    encode_band_tiled(band, &mut payload);
                } else {
                    encode_band_plain(band, &mut payload);
                }
            }
        }
        Ok(payload)
    }

    fn decode_level(
        &self,
        payload: &[u8],
        channels: &mut [WaveletTransform],
        level: usize,
        quant: u8,
    ) -> Result<()> {
        let mut reader = PayloadReader::new(payload);
        for transform in channels.iter_mut() {
            let top = level == transform.n_levels() - 1;
            let cover = cover_rect(transform, level);
            for &orientation in payload_orientations(top) {
                let band = transform.band_mut(level, orientation);
                band.alloc()?;
                if self.roi {
                    decode_band_tiled(&mut reader, band, &cover)?;
                } else {
                    decode_band_plain(&mut reader, band)?;
                }
                // undo the forward quantization: details always, LL only at
                // the deepest level
                if orientation != Orientation::Ll || top {
                    band.dequantize(quant);
                }
            }
        }
        if !reader.at_end() {
            return Err(PgfError::Format(format!(
                "level payload carries {} unread bytes",
                reader.remaining()
            )));
        }
        Ok(())
    }
}

/// Tile-index rectangle the decoder is interested in at this level; the
/// whole grid when no ROI has been set.
fn cover_rect(transform: &WaveletTransform, level: usize) -> Rect {
    match transform.roi_indices() {
        Some(indices) => *indices.indices(level),
        None => {
            let n = transform.band(level, Orientation::Ll).n_tiles().max(1);
            Rect::new(0, 0, n, n)
        }
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_words(out: &mut Vec<u8>, words: &[i32]) {
    let le_words: Vec<LeI32> = words.iter().map(|&w| w.into()).collect();
    out.extend_from_slice(cast_slice(&le_words));
}

fn encode_band_plain(band: &Subband, out: &mut Vec<u8>) {
    let le_words: Vec<LeI32> = band.buffer().iter().map(|&c| (c as i32).into()).collect();
    out.extend_from_slice(cast_slice(&le_words));
}

fn decode_band_plain(reader: &mut PayloadReader, band: &mut Subband) -> Result<()> {
    let len = band.buffer().len();
    let words = reader.read_words(len)?;
    for (dst, &w) in band.buffer_mut().iter_mut().zip(&words) {
        *dst = w as Coeff;
    }
    Ok(())
}

/// Emit one subband tile by tile, row-major tile order. Each tile is a
/// chain of blocks of at most `BUFFER_SIZE` words; the last block of a tile
/// carries the tile-end flag. Zero-area tiles still emit one empty block so
/// the framing stays self-describing.
fn encode_band_tiled(band: &mut Subband, out: &mut Vec<u8>) {
    let n_tiles = band.n_tiles();
    let roi = band.roi();
    for tj in 0..n_tiles {
        for ti in 0..n_tiles {
            let (x, y, w, h) = band.tile_position(ti, tj);
            let mut words: Vec<i32> = Vec::with_capacity(w as usize * h as usize);
            for row in 0..h {
                band.init_cursor(x - roi.left, y - roi.top + row);
                for _ in 0..w {
                    words.push(band.read_coeff() as i32);
                }
            }

            if words.is_empty() {
                push_u16(out, RoiBlockHeader::new(0, true).to_u16());
            } else {
                let mut chunks = words.chunks(BUFFER_SIZE).peekable();
                while let Some(chunk) = chunks.next() {
                    let header = RoiBlockHeader::new(chunk.len(), chunks.peek().is_none());
                    push_u16(out, header.to_u16());
                    push_words(out, chunk);
                }
            }
        }
    }
}

/// Walk the full tile grid in encode order, reading the tiles inside
/// `cover` into the subband buffer and skipping the rest. Block sizes must
/// add up to exactly the tile area before the tile-end flag.
fn decode_band_tiled(
    reader: &mut PayloadReader,
    band: &mut Subband,
    cover: &Rect,
) -> Result<()> {
    let n_tiles = band.n_tiles();
    let roi = band.roi();
    for tj in 0..n_tiles {
        for ti in 0..n_tiles {
            if cover.is_inside(ti, tj) {
                let (x, y, w, h) = band.tile_position(ti, tj);
                let area = w as usize * h as usize;
                let mut words: Vec<i32> = Vec::with_capacity(area);
                loop {
                    let header = RoiBlockHeader::from_u16(reader.read_u16()?);
                    let n_words = header.buffer_size as usize;
                    if words.len() + n_words > area {
                        return Err(PgfError::Format(format!(
                            "tile block of {n_words} words overruns tile area {area}"
                        )));
                    }
                    words.extend(reader.read_words(n_words)?);
                    if header.tile_end {
                        break;
                    }
                }
                if words.len() != area {
                    return Err(PgfError::Format(format!(
                        "tile holds {} of {area} words",
                        words.len()
                    )));
                }

                let mut it = words.iter();
                for row in 0..h {
                    band.init_cursor(x - roi.left, y - roi.top + row);
                    for _ in 0..w {
                        band.write_coeff(*it.next().unwrap() as Coeff);
                    }
                }
            } else {
                loop {
                    let header = RoiBlockHeader::from_u16(reader.read_u16()?);
                    reader.skip_words(header.buffer_size as usize)?;
                    if header.tile_end {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Cursor over a level payload.
struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        PayloadReader { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn read_u16(&mut self) -> Result<u16> {
        if self.remaining() < 2 {
            return Err(PgfError::Format("level payload truncated".into()));
        }
        let v = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    fn read_words(&mut self, count: usize) -> Result<Vec<i32>> {
        let bytes = count * 4;
        if self.remaining() < bytes {
            return Err(PgfError::Format("level payload truncated".into()));
        }
        let le_words: &[LeI32] = cast_slice(&self.data[self.pos..self.pos + bytes]);
        let words = le_words.iter().map(|&w| w.into()).collect();
        self.pos += bytes;
        Ok(words)
    }

    fn skip_words(&mut self, count: usize) -> Result<()> {
        let bytes = count * 4;
        if self.remaining() < bytes {
            return Err(PgfError::Format("level payload truncated".into()));
        }
        self.pos += bytes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pyramid_with_level1(values: Coeff) -> WaveletTransform {
        let mut t = WaveletTransform::new(8, 8, 1, Some(vec![values; 64])).unwrap();
        t.forward(0, 0).unwrap();
        t
    }

    #[test]
    fn test_plain_level_round_trip() {
        let codec = RawBlockCodec::new(false);
        let mut channels = vec![pyramid_with_level1(33)];
        let payload = codec.encode_level(&mut channels, 1).unwrap();
        // four 4x4 subbands of i32 words
        assert_eq!(payload.len(), 4 * 16 * 4);

        let mut decoded = vec![WaveletTransform::new(8, 8, 1, None).unwrap()];
        codec.decode_level(&payload, &mut decoded, 1, 0).unwrap();
        for o in Orientation::ALL {
            assert_eq!(
                decoded[0].band(1, o).buffer(),
                channels[0].band(1, o).buffer()
            );
        }
    }

    #[test]
    fn test_tiled_level_round_trip() {
        let codec = RawBlockCodec::new(true);
        let full = Rect::new(0, 0, 8, 8);
        let mut channels = vec![pyramid_with_level1(-7)];
        channels[0].set_roi(full);
        let payload = codec.encode_level(&mut channels, 1).unwrap();

        let mut decoded = vec![WaveletTransform::new(8, 8, 1, None).unwrap()];
        decoded[0].set_roi(full);
        codec.decode_level(&payload, &mut decoded, 1, 0).unwrap();
        for o in Orientation::ALL {
            assert_eq!(
                decoded[0].band(1, o).buffer(),
                channels[0].band(1, o).buffer()
            );
        }
    }

    #[test]
    fn test_truncated_payload_is_a_format_error() {
        let codec = RawBlockCodec::new(false);
        let mut channels = vec![pyramid_with_level1(5)];
        let payload = codec.encode_level(&mut channels, 1).unwrap();

        let mut decoded = vec![WaveletTransform::new(8, 8, 1, None).unwrap()];
        let short = &payload[..payload.len() - 4];
        assert!(matches!(
            codec.decode_level(short, &mut decoded, 1, 0),
            Err(PgfError::Format(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_are_a_format_error() {
        let codec = RawBlockCodec::new(false);
        let mut channels = vec![pyramid_with_level1(5)];
        let mut payload = codec.encode_level(&mut channels, 1).unwrap();
        payload.extend_from_slice(&[0, 0, 0, 0]);

        let mut decoded = vec![WaveletTransform::new(8, 8, 1, None).unwrap()];
        assert!(matches!(
            codec.decode_level(&payload, &mut decoded, 1, 0),
            Err(PgfError::Format(_))
        ));
    }
}

// src/wavelet/subband.rs

//! A single wavelet subband: one quarter of a decomposition level.
//!
//! The subband owns its coefficient buffer, which is allocated on demand
//! and released as soon as the transform that produced it has been
//! consumed. Under the ROI coding scheme the buffer covers only the ROI
//! rectangle of the subband; a row of the buffer is then `roi.width()`
//! coefficients wide and the read/write cursor wraps at ROI rows.

use crate::geom::Rect;
use crate::utils::error::{PgfError, Result};
use crate::Coeff;

/// Subband orientation within one decomposition level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Orientation {
    /// Low-pass approximation.
    Ll = 0,
    /// Horizontal detail.
    Hl = 1,
    /// Vertical detail.
    Lh = 2,
    /// Diagonal detail.
    Hh = 3,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Ll,
        Orientation::Hl,
        Orientation::Lh,
        Orientation::Hh,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct Subband {
    width: u32,
    height: u32,
    level: usize,
    /// Coefficient buffer; empty while unallocated.
    data: Vec<Coeff>,
    /// Read/write cursor into `data`.
    data_pos: usize,
    /// Region covered by the buffer. Defaults to the whole subband and is
    /// narrowed by `set_roi` under the ROI coding scheme.
    roi: Rect,
    /// Tiles per axis under the ROI coding scheme; 0 when unused.
    n_tiles: u32,
}

impl Subband {
    pub fn new(width: u32, height: u32, level: usize) -> Self {
        Subband {
            width,
            height,
            level,
            data: Vec::new(),
            data_pos: 0,
            roi: Rect::new(0, 0, width, height),
            n_tiles: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Region covered by the buffer, in subband coordinates.
    pub fn roi(&self) -> Rect {
        self.roi
    }

    /// Width of one buffer row.
    pub fn buffer_width(&self) -> u32 {
        self.roi.width()
    }

    fn buffer_len(&self) -> usize {
        self.roi.width() as usize * self.roi.height() as usize
    }

    /// Restrict the buffer to `rect` (subband coordinates). Must not shrink
    /// a buffer that is already allocated.
    pub fn set_roi(&mut self, rect: Rect) {
        debug_assert!(rect.right <= self.width && rect.bottom <= self.height);
        debug_assert!(
            self.data.is_empty()
                || self.data.len() == rect.width() as usize * rect.height() as usize
        );
        self.roi = rect;
    }

    pub fn set_n_tiles(&mut self, n_tiles: u32) {
        self.n_tiles = n_tiles;
    }

    pub fn n_tiles(&self) -> u32 {
        self.n_tiles
    }

    /// Allocate a zeroed buffer covering the ROI and rewind the cursor.
    pub fn alloc(&mut self) -> Result<()> {
        let len = self.buffer_len();
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| PgfError::InsufficientMemory(len))?;
        data.resize(len, 0);
        self.data = data;
        self.data_pos = 0;
        Ok(())
    }

    /// Adopt an externally produced buffer (encode path: the imported
    /// channel becomes `subband[0][LL]`).
    pub fn set_buffer(&mut self, data: Vec<Coeff>) -> Result<()> {
        if data.len() != self.buffer_len() {
            return Err(PgfError::InvalidArg(format!(
                "channel buffer holds {} coefficients, subband needs {}",
                data.len(),
                self.buffer_len()
            )));
        }
        self.data = data;
        self.data_pos = 0;
        Ok(())
    }

    /// Move the buffer out, leaving the subband unallocated.
    pub fn take_buffer(&mut self) -> Vec<Coeff> {
        self.data_pos = 0;
        std::mem::take(&mut self.data)
    }

    pub fn free_buffer(&mut self) {
        self.data = Vec::new();
        self.data_pos = 0;
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty() || self.buffer_len() == 0
    }

    pub fn buffer(&self) -> &[Coeff] {
        &self.data
    }

    pub fn buffer_mut(&mut self) -> &mut [Coeff] {
        &mut self.data
    }

    /// Append one coefficient at the cursor. Advancing by one wraps at ROI
    /// rows because the buffer is exactly `roi.width()` wide.
    #[inline]
    pub fn write_coeff(&mut self, value: Coeff) {
        self.data[self.data_pos] = value;
        self.data_pos += 1;
    }

    /// Read one coefficient at the cursor and advance.
    #[inline]
    pub fn read_coeff(&mut self) -> Coeff {
        let value = self.data[self.data_pos];
        self.data_pos += 1;
        value
    }

    /// Place the cursor at `(col, row)` relative to the buffer origin.
    pub fn init_cursor(&mut self, col: u32, row: u32) {
        self.data_pos = row as usize * self.buffer_width() as usize + col as usize;
    }

    /// Current cursor position, for `advance_row_cursor`.
    pub fn cursor(&self) -> usize {
        self.data_pos
    }

    /// Move the cursor to the row below the one that started at `saved`.
    /// Used when a transform pass consumes rows narrower than the buffer.
    pub fn advance_row_cursor(&mut self, saved: usize) {
        self.data_pos = saved + self.buffer_width() as usize;
    }

    /// Discard the lowest `quant` bits of every coefficient
    /// (sign-preserving arithmetic shift).
    pub fn quantize(&mut self, quant: u8) {
        if quant > 0 {
            for c in &mut self.data {
                *c >>= quant;
            }
        }
    }

    /// Rescale quantized coefficients back to their magnitude range.
    pub fn dequantize(&mut self, quant: u8) {
        if quant > 0 {
            for c in &mut self.data {
                *c <<= quant;
            }
        }
    }

    /// Top-left corner and extent of tile `(tile_x, tile_y)` in subband
    /// coordinates. Tiles partition the subband by repeated halving, the
    /// left/top half taking the ceiling share, so they nest dyadically
    /// across levels.
    pub fn tile_position(&self, tile_x: u32, tile_y: u32) -> (u32, u32, u32, u32) {
        debug_assert!(tile_x < self.n_tiles && tile_y < self.n_tiles);
        let (mut left, mut right) = (0, self.n_tiles);
        let (mut top, mut bottom) = (0, self.n_tiles);
        let (mut x, mut y) = (0, 0);
        let (mut w, mut h) = (self.width, self.height);

        while right - left > 1 {
            let m = (left + right) >> 1;
            if tile_x >= m {
                x += (w + 1) >> 1;
                w >>= 1;
                left = m;
            } else {
                w = (w + 1) >> 1;
                right = m;
            }
            let m = (top + bottom) >> 1;
            if tile_y >= m {
                y += (h + 1) >> 1;
                h >>= 1;
                top = m;
            } else {
                h = (h + 1) >> 1;
                bottom = m;
            }
        }
        (x, y, w, h)
    }
}

// src/wavelet/roi.rs

//! Per-level tile-index rectangles for a region of interest.
//!
//! Tiles nest exactly by a factor of two across levels, so a single binary
//! descent per ROI bound yields the tile indices of every level at once
//! (4·L comparisons for L levels).

use crate::geom::Rect;

/// Tile-index rectangles of an image-space ROI, one per transform level.
///
/// Immutable after `compute`; `indices(level)` is a half-open rectangle in
/// tile coordinates `[0, n_tiles(level))`.
#[derive(Debug, Clone)]
pub struct RoiIndices {
    n_levels: usize,
    indices: Vec<Rect>,
}

impl RoiIndices {
    pub fn new(n_levels: usize) -> Self {
        RoiIndices {
            n_levels,
            indices: vec![Rect::default(); n_levels],
        }
    }

    pub fn levels(&self) -> usize {
        self.n_levels
    }

    /// Number of tiles per axis at the given level.
    pub fn n_tiles(&self, level: usize) -> u32 {
        debug_assert!(level < self.n_levels);
        1 << (self.n_levels - level - 1)
    }

    /// Tile-index rectangle at the given level.
    pub fn indices(&self, level: usize) -> &Rect {
        debug_assert!(level < self.n_levels);
        &self.indices[level]
    }

    /// Compute tile indices for the given image-space rectangle.
    pub fn compute(&mut self, width: u32, height: u32, rect: &Rect) {
        self.compute_tile_index(width, height, rect.left, true, true);
        self.compute_tile_index(width, height, rect.top, false, true);
        self.compute_tile_index(width, height, rect.right, true, false);
        self.compute_tile_index(width, height, rect.bottom, false, false);
    }

    /// Binary descent for one bound. Min bounds (left/top) record the index
    /// of the containing tile, max bounds (right/bottom) record index + 1,
    /// at every level on the way down.
    fn compute_tile_index(
        &mut self,
        width: u32,
        height: u32,
        pos: u32,
        horizontal: bool,
        is_min: bool,
    ) {
        let mut tile_index = 0u32;
        let mut tile_min = 0u32;
        let mut tile_max = if horizontal { width } else { height };
        debug_assert!(pos <= tile_max);

        for i in (0..self.n_levels).rev() {
            let idx = &mut self.indices[i];
            match (horizontal, is_min) {
                (true, true) => idx.left = tile_index,
                (true, false) => idx.right = tile_index + 1,
                (false, true) => idx.top = tile_index,
                (false, false) => idx.bottom = tile_index + 1,
            }

            tile_index <<= 1;
            let m = (tile_min + tile_max) / 2;
            if pos >= m {
                tile_min = m;
                tile_index += 1;
            } else {
                tile_max = m;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descent_on_16x16() {
        // 16x16 image, 3 header levels (4 transform levels), ROI (4,4)-(12,12)
        let mut roi = RoiIndices::new(4);
        roi.compute(16, 16, &Rect::new(4, 4, 8, 8));

        assert_eq!(roi.n_tiles(0), 8);
        assert_eq!(roi.n_tiles(3), 1);

        assert_eq!(*roi.indices(0), Rect { left: 2, top: 2, right: 7, bottom: 7 });
        assert_eq!(*roi.indices(1), Rect { left: 1, top: 1, right: 4, bottom: 4 });
        assert_eq!(*roi.indices(2), Rect { left: 0, top: 0, right: 2, bottom: 2 });
        assert_eq!(*roi.indices(3), Rect { left: 0, top: 0, right: 1, bottom: 1 });
    }

    #[test]
    fn test_full_rect_covers_every_tile() {
        let mut roi = RoiIndices::new(3);
        roi.compute(64, 32, &Rect::new(0, 0, 64, 32));
        for level in 0..3 {
            let n = roi.n_tiles(level);
            let idx = roi.indices(level);
            assert_eq!(*idx, Rect { left: 0, top: 0, right: n, bottom: n });
        }
    }

    #[test]
    fn test_indices_nest_across_levels() {
        // the cover at level l-1 stays within twice the cover at level l
        let mut roi = RoiIndices::new(5);
        roi.compute(123, 77, &Rect::new(17, 5, 40, 60));
        for level in 1..5 {
            let coarse = *roi.indices(level);
            let fine = *roi.indices(level - 1);
            assert!(fine.left >= 2 * coarse.left);
            assert!(fine.right <= 2 * coarse.right);
            assert!(fine.top >= 2 * coarse.top);
            assert!(fine.bottom <= 2 * coarse.bottom);
        }
    }
}

// src/wavelet/mod.rs

//! Dyadic wavelet transform pipeline: subband buffers, ROI tile indices and
//! the recursive lifting transform.

pub mod roi;
pub mod subband;
pub mod transform;

pub use roi::RoiIndices;
pub use subband::{Orientation, Subband};
pub use transform::{WaveletTransform, FILTER_HEIGHT, FILTER_WIDTH};

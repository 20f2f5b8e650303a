// src/container/mod.rs

//! PGF bitstream container: pre-header, header, post-header and the ROI
//! block framing shared by the level codec.

pub mod header;

pub use header::{
    current_version, Header, ImageMode, PostHeader, PreHeader, RgbQuad, RoiBlockHeader,
    BUFFER_SIZE, COLOR_TABLE_LEN, HEADER_SIZE, MAX_BIT_PLANES, MAX_CHANNELS, MAX_LEVEL,
    MAX_QUALITY, N_SUBBANDS, PGF32, PGF_ROI, VERSION2, VERSION5, VERSION6,
};

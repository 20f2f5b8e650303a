// src/utils/error.rs

use thiserror::Error;

/// The primary error type for all operations in the PGF codec.
#[derive(Error, Debug)]
pub enum PgfError {
    /// Stream read/write/seek failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Coefficient buffer allocation failed during a transform.
    #[error("insufficient memory for a buffer of {0} coefficients")]
    InsufficientMemory(usize),

    /// Malformed bitstream: bad magic, unsupported version flags,
    /// inconsistent header or length table.
    #[error("format error: {0}")]
    Format(String),

    /// Out-of-range level, malformed channel map, ROI outside the image.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The façade was used before `open` (decoding) or `set_header`
    /// (encoding).
    #[error("image has not been opened")]
    NotOpen,

    /// `open` or `set_header` was called twice on the same instance.
    #[error("image is already open")]
    AlreadyOpen,
}

/// A specialized `Result` type for PGF operations.
pub type Result<T> = std::result::Result<T, PgfError>;

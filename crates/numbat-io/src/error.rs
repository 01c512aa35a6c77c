//! Error types for tensor I/O

use std::io;
use thiserror::Error;

use numbat_tensor::TensorError;

/// Result type alias for I/O operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or printing tensors
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The decoded data could not form a tensor
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// The file does not start with the npy magic string
    #[error("Invalid npy magic: expected '\\x93NUMPY', found {0:?}")]
    InvalidMagic([u8; 6]),

    /// Unsupported npy format version
    #[error("Unsupported npy version: {0}.{1}")]
    UnsupportedVersion(u8, u8),

    /// Malformed header dictionary
    #[error("Invalid npy header: {0}")]
    InvalidHeader(String),

    /// The type descriptor names a type this crate cannot decode
    #[error("Unsupported dtype descriptor: '{0}'")]
    UnsupportedDtype(String),

    /// The stored element type differs from the requested one
    #[error("Dtype mismatch: file holds '{found}', expected '{expected}'")]
    DtypeMismatch {
        expected: String,
        found: String,
    },

    /// The stored array has a different number of dimensions
    #[error("Rank mismatch: file holds {found} dimensions, expected {expected}")]
    RankMismatch {
        expected: usize,
        found: usize,
    },

    /// A text field could not be parsed
    #[error("Parse error on line {line}: {message}")]
    Parse {
        line: usize,
        message: String,
    },

    /// Text files hold only vectors and matrices
    #[error("Text format supports 1 or 2 dimensions, got {0}")]
    UnsupportedRank(usize),
}

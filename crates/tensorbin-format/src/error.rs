use std::io;

use tensorbin_core::{DType, TensorError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatError>;

/// Coarse classification of a [`FormatError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    UnsupportedType,
    Malformed,
    Usage,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported element type: {0}")]
    UnsupportedType(DType),

    #[error("malformed tensor record: {0}")]
    Malformed(String),

    #[error("record is tagged {stored} but {expected} was requested")]
    TypeMismatch { stored: DType, expected: DType },

    #[error("untagged record needs an element type")]
    MissingType,

    #[error("shape {0:?} does not fit an i32 record header")]
    ShapeOverflow(Vec<usize>),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl FormatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormatError::Io(_) => ErrorKind::Io,
            FormatError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            FormatError::Malformed(_) => ErrorKind::Malformed,
            FormatError::TypeMismatch { .. }
            | FormatError::MissingType
            | FormatError::ShapeOverflow(_)
            | FormatError::Tensor(_) => ErrorKind::Usage,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        FormatError::Malformed(msg.into())
    }
}

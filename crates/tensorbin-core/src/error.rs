use thiserror::Error;

use crate::DType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("{dtype} tensor of shape {shape:?} needs {expected} bytes, buffer holds {actual}")]
    LengthMismatch {
        dtype: DType,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("element count of shape {0:?} overflows usize")]
    ShapeOverflow(Vec<usize>),

    #[error("tensor elements are {actual}, requested {expected}")]
    DTypeMismatch { expected: DType, actual: DType },

    #[error("{strides} strides given for a rank-{rank} tensor")]
    StrideRank { rank: usize, strides: usize },

    #[error("strided view reaches outside its {len}-element buffer")]
    ViewOutOfBounds { len: usize },

    #[error("unknown element type: {0}")]
    UnknownDType(String),
}

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use smallvec::{smallvec, SmallVec};

use crate::{Element, TensorError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    BF16,
    F16,
    F32,
    F64,
    I32,
    I64,
    U8,
}

impl DType {
    pub const ALL: [DType; 7] = [
        DType::BF16,
        DType::F16,
        DType::F32,
        DType::F64,
        DType::I32,
        DType::I64,
        DType::U8,
    ];

    pub fn byte_size(self) -> usize {
        match self {
            DType::BF16 | DType::F16 => 2,
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
            DType::U8 => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::BF16 => "bf16",
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bf16" | "bfloat16" => Ok(DType::BF16),
            "f16" | "fp16" | "half" | "float16" => Ok(DType::F16),
            "f32" | "fp32" | "float" | "float32" => Ok(DType::F32),
            "f64" | "fp64" | "double" | "float64" => Ok(DType::F64),
            "i32" | "int" | "int32" => Ok(DType::I32),
            "i64" | "long" | "int64" => Ok(DType::I64),
            "u8" | "uint8" => Ok(DType::U8),
            _ => Err(TensorError::UnknownDType(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn scalar() -> Self {
        Self(SmallVec::new())
    }
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Element count. The empty shape is a scalar and holds one element; any
    /// zero extent makes the tensor empty.
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Like [`Shape::numel`], for extents that have not been validated yet.
    pub fn checked_numel(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Element strides of a gap-free, last-dimension-fastest layout.
    pub fn row_major_strides(&self) -> SmallVec<[isize; 6]> {
        let mut strides: SmallVec<[isize; 6]> = smallvec![0; self.rank()];
        let mut acc = 1isize;
        for (stride, &dim) in strides.iter_mut().zip(&self.0).rev() {
            *stride = acc;
            acc = acc.saturating_mul(dim as isize);
        }
        strides
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims())
    }
}

impl From<&[usize]> for Shape {
    fn from(d: &[usize]) -> Self {
        Self::from_slice(d)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(d: Vec<usize>) -> Self {
        Self(SmallVec::from_vec(d))
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(d: [usize; N]) -> Self {
        Self::from_slice(&d)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDesc {
    pub dtype: DType,
    pub shape: Shape,
    /// Element strides into the storage; `None` means row-major from offset 0.
    pub strides: Option<SmallVec<[isize; 6]>>,
    /// Element offset of the first logical element.
    pub offset: usize,
}

/// Dense tensor over host memory.
///
/// Storage is a shared byte buffer holding elements in native byte order. A
/// tensor is either contiguous (row-major, no gaps) or a strided view over a
/// larger buffer; [`Tensor::contiguous`] materializes the latter.
#[derive(Clone, Debug)]
pub struct Tensor {
    desc: TensorDesc,
    storage: Bytes,
}

impl Tensor {
    pub fn from_bytes(dtype: DType, shape: Shape, bytes: Bytes) -> Result<Self, TensorError> {
        let expected = shape
            .checked_numel()
            .and_then(|n| n.checked_mul(dtype.byte_size()))
            .ok_or_else(|| TensorError::ShapeOverflow(shape.dims().to_vec()))?;
        if bytes.len() != expected {
            return Err(TensorError::LengthMismatch {
                dtype,
                shape: shape.dims().to_vec(),
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            desc: TensorDesc {
                dtype,
                shape,
                strides: None,
                offset: 0,
            },
            storage: bytes,
        })
    }

    pub fn from_slice<T: Element>(shape: Shape, values: &[T]) -> Result<Self, TensorError> {
        let bytes = Bytes::copy_from_slice(bytemuck::cast_slice(values));
        Self::from_bytes(T::DTYPE, shape, bytes)
    }

    pub fn from_vec<T: Element>(shape: Shape, values: Vec<T>) -> Result<Self, TensorError> {
        Self::from_slice(shape, &values)
    }

    pub fn scalar<T: Element>(value: T) -> Self {
        Self {
            desc: TensorDesc {
                dtype: T::DTYPE,
                shape: Shape::scalar(),
                strides: None,
                offset: 0,
            },
            storage: Bytes::copy_from_slice(bytemuck::bytes_of(&value)),
        }
    }

    /// Strided view over this tensor's storage buffer.
    ///
    /// `offset` and `strides` are in elements and index the underlying
    /// storage directly, ignoring any layout this tensor already has.
    pub fn as_strided(
        &self,
        shape: Shape,
        offset: usize,
        strides: &[isize],
    ) -> Result<Self, TensorError> {
        if strides.len() != shape.rank() {
            return Err(TensorError::StrideRank {
                rank: shape.rank(),
                strides: strides.len(),
            });
        }
        let numel = shape
            .checked_numel()
            .ok_or_else(|| TensorError::ShapeOverflow(shape.dims().to_vec()))?;

        let len = self.storage.len() / self.desc.dtype.byte_size();
        if numel > 0 {
            let (mut lo, mut hi) = (offset as i128, offset as i128);
            for (&dim, &stride) in shape.dims().iter().zip(strides) {
                let reach = (dim as i128 - 1) * stride as i128;
                if reach < 0 {
                    lo += reach;
                } else {
                    hi += reach;
                }
            }
            if lo < 0 || hi >= len as i128 {
                return Err(TensorError::ViewOutOfBounds { len });
            }
        }

        Ok(Self {
            desc: TensorDesc {
                dtype: self.desc.dtype,
                shape,
                strides: Some(strides.iter().copied().collect()),
                offset,
            },
            storage: self.storage.clone(),
        })
    }

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }
    pub fn dtype(&self) -> DType {
        self.desc.dtype
    }
    pub fn shape(&self) -> &Shape {
        &self.desc.shape
    }
    pub fn rank(&self) -> usize {
        self.desc.shape.rank()
    }
    pub fn numel(&self) -> usize {
        self.desc.shape.numel()
    }
    pub fn byte_len(&self) -> usize {
        self.numel() * self.desc.dtype.byte_size()
    }

    pub fn is_contiguous(&self) -> bool {
        match &self.desc.strides {
            None => true,
            Some(strides) => self.numel() == 0 || *strides == self.desc.shape.row_major_strides(),
        }
    }

    /// Row-major, gap-free copy of this tensor. Shares the buffer when the
    /// layout already is row-major.
    pub fn contiguous(&self) -> Tensor {
        let width = self.desc.dtype.byte_size();
        let desc = TensorDesc {
            strides: None,
            offset: 0,
            ..self.desc.clone()
        };
        if self.byte_len() == 0 {
            return Tensor {
                desc,
                storage: Bytes::new(),
            };
        }

        let strides = match &self.desc.strides {
            Some(strides) if !self.is_contiguous() => strides,
            _ => {
                let start = self.desc.offset * width;
                return Tensor {
                    desc,
                    storage: self.storage.slice(start..start + self.byte_len()),
                };
            }
        };

        let dims = self.desc.shape.dims();
        let mut index: SmallVec<[usize; 6]> = smallvec![0; dims.len()];
        let mut out = Vec::with_capacity(self.byte_len());
        for _ in 0..self.numel() {
            let elem = index
                .iter()
                .zip(strides)
                .fold(self.desc.offset as isize, |acc, (&i, &s)| acc + i as isize * s);
            let start = elem as usize * width;
            out.extend_from_slice(&self.storage[start..start + width]);

            for axis in (0..dims.len()).rev() {
                index[axis] += 1;
                if index[axis] < dims[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }

        Tensor {
            desc,
            storage: Bytes::from(out),
        }
    }

    /// Row-major element bytes in native byte order.
    pub fn into_bytes(self) -> Bytes {
        if self.desc.strides.is_none() {
            return self.storage;
        }
        self.contiguous().storage
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        if T::DTYPE != self.desc.dtype {
            return Err(TensorError::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.desc.dtype,
            });
        }
        Ok(bytemuck::pod_collect_to_vec::<u8, T>(&self.contiguous().storage))
    }
}

/// Bit-level equality of dtype, shape and logical elements.
impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.desc.dtype == other.desc.dtype
            && self.desc.shape == other.desc.shape
            && self.contiguous().storage == other.contiguous().storage
    }
}

#[cfg(test)]
mod tests {
    use half::bf16;

    use super::*;

    #[test]
    fn numel_of_scalar_and_empty_shapes() {
        assert_eq!(Shape::scalar().numel(), 1);
        assert_eq!(Shape::from([3, 0, 5]).numel(), 0);
        assert_eq!(Shape::from([3, 4, 5]).numel(), 60);
        assert_eq!(Shape::from([usize::MAX, 2]).checked_numel(), None);
    }

    #[test]
    fn row_major_strides_last_dim_fastest() {
        assert_eq!(Shape::from([3, 4, 5]).row_major_strides().as_slice(), &[20, 5, 1]);
        assert!(Shape::scalar().row_major_strides().is_empty());
    }

    #[test]
    fn parses_dtype_names_and_aliases() {
        assert_eq!("bf16".parse::<DType>().unwrap(), DType::BF16);
        assert_eq!("BFloat16".parse::<DType>().unwrap(), DType::BF16);
        assert_eq!("int64".parse::<DType>().unwrap(), DType::I64);
        assert_eq!("float".parse::<DType>().unwrap(), DType::F32);
        for dtype in DType::ALL {
            assert_eq!(dtype.to_string().parse::<DType>().unwrap(), dtype);
        }
        assert!(matches!(
            "complex64".parse::<DType>(),
            Err(TensorError::UnknownDType(_))
        ));
    }

    #[test]
    fn rejects_buffer_of_wrong_length() {
        let err = Tensor::from_vec(Shape::from([2, 3]), vec![0f32; 5]).unwrap_err();
        assert_eq!(
            err,
            TensorError::LengthMismatch {
                dtype: DType::F32,
                shape: vec![2, 3],
                expected: 24,
                actual: 20,
            }
        );
    }

    #[test]
    fn to_vec_checks_dtype() {
        let t = Tensor::from_vec(Shape::from([2]), vec![1i32, 2]).unwrap();
        assert_eq!(t.to_vec::<i32>().unwrap(), vec![1, 2]);
        assert_eq!(
            t.to_vec::<i64>().unwrap_err(),
            TensorError::DTypeMismatch {
                expected: DType::I64,
                actual: DType::I32,
            }
        );
    }

    #[test]
    fn bf16_storage_is_its_bit_pattern() {
        let values = [bf16::from_f32(1.5), bf16::NEG_ZERO, bf16::NAN];
        let t = Tensor::from_slice(Shape::from([3]), &values).unwrap();
        let bits: Vec<u16> = t
            .into_bytes()
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(bits, values.iter().map(|v| v.to_bits()).collect::<Vec<_>>());
    }

    #[test]
    fn sliced_view_materializes_row_major() {
        // base[3, 4, 5] sliced as base[:, 1:3, :]
        let base = Tensor::from_vec(Shape::from([3, 4, 5]), (0..60).collect::<Vec<i64>>()).unwrap();
        let view = base
            .as_strided(Shape::from([3, 2, 5]), 5, &[20, 5, 1])
            .unwrap();
        assert!(!view.is_contiguous());

        let expected: Vec<i64> = (0..3)
            .flat_map(|i| (1..3).flat_map(move |j| (0..5).map(move |k| i * 20 + j * 5 + k)))
            .collect();
        let dense = view.contiguous();
        assert!(dense.is_contiguous());
        assert_eq!(dense.to_vec::<i64>().unwrap(), expected);
        assert_eq!(view, dense);
    }

    #[test]
    fn transposed_view_gathers_elements() {
        let base = Tensor::from_vec(Shape::from([2, 3]), vec![1f64, 2., 3., 4., 5., 6.]).unwrap();
        let t = base.as_strided(Shape::from([3, 2]), 0, &[1, 3]).unwrap();
        assert_eq!(t.to_vec::<f64>().unwrap(), vec![1., 4., 2., 5., 3., 6.]);
    }

    #[test]
    fn row_major_view_with_offset_is_contiguous() {
        let base = Tensor::from_vec(Shape::from([4, 2]), (0..8).collect::<Vec<i32>>()).unwrap();
        let rows = base.as_strided(Shape::from([2, 2]), 4, &[2, 1]).unwrap();
        assert!(rows.is_contiguous());
        assert_eq!(rows.to_vec::<i32>().unwrap(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn empty_view_materializes_at_any_offset() {
        let base = Tensor::from_vec(Shape::from([6]), vec![0i32; 6]).unwrap();
        let empty = base.as_strided(Shape::from([0]), 100, &[1]).unwrap();
        let dense = empty.contiguous();
        assert_eq!(dense.byte_len(), 0);
        assert!(dense.to_vec::<i32>().unwrap().is_empty());
        assert_eq!(empty, Tensor::from_vec(Shape::from([0]), Vec::<i32>::new()).unwrap());

        let gapped = base.as_strided(Shape::from([2, 0]), 50, &[7, 3]).unwrap();
        assert!(gapped.into_bytes().is_empty());
    }

    #[test]
    fn view_must_stay_inside_storage() {
        let base = Tensor::from_vec(Shape::from([6]), vec![0u8; 6]).unwrap();
        assert_eq!(
            base.as_strided(Shape::from([2, 3]), 1, &[3, 1]).unwrap_err(),
            TensorError::ViewOutOfBounds { len: 6 }
        );
        assert_eq!(
            base.as_strided(Shape::from([2]), 0, &[1, 1]).unwrap_err(),
            TensorError::StrideRank {
                rank: 1,
                strides: 2
            }
        );
    }
}

use tensorbin_core::DType;

use crate::{FormatError, Result};

/// Element types a record can carry.
pub const SUPPORTED_DTYPES: [DType; 5] = [DType::BF16, DType::F32, DType::F64, DType::I32, DType::I64];

pub fn is_supported(dtype: DType) -> bool {
    SUPPORTED_DTYPES.contains(&dtype)
}

pub fn ensure_supported(dtype: DType) -> Result<()> {
    if is_supported(dtype) {
        Ok(())
    } else {
        Err(FormatError::UnsupportedType(dtype))
    }
}

/// Scalars with a fixed little-endian on-disk form.
pub(crate) trait Wire: Copy {
    const WIDTH: usize;

    /// `bytes` is exactly `WIDTH` long.
    fn read_le(bytes: &[u8]) -> Self;
    fn put_le(self, out: &mut Vec<u8>);
}

macro_rules! wire {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Wire for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                fn put_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

wire!(u16, i32, i64, f32, f64);

pub(crate) fn decode_slice<T: Wire>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::WIDTH).map(T::read_le).collect()
}

pub(crate) fn encode_slice<T: Wire>(values: &[T], out: &mut Vec<u8>) {
    out.reserve(values.len() * T::WIDTH);
    for &v in values {
        v.put_le(out);
    }
}

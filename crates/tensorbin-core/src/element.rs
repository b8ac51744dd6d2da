use half::{bf16, f16};

use crate::DType;

/// Rust scalar types that can back a [`crate::Tensor`].
///
/// The `Pod` bound is what lets the tensor buffer be viewed as raw bytes
/// without conversion; for `bf16` this means the stored bytes are exactly
/// its `u16` bit pattern.
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    const DTYPE: DType;
}

macro_rules! element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
            }
        )*
    };
}

element! {
    bf16 => BF16,
    f16 => F16,
    f32 => F32,
    f64 => F64,
    i32 => I32,
    i64 => I64,
    u8 => U8,
}

//! Binary tensor records.
//!
//! A record is `dim_num: i32`, `dim_num` extents as `i32`, then the row-major
//! element data, all little-endian. The element type is not stored; readers
//! pass it in. `bf16` data is written as the raw `u16` bit pattern of each
//! element.
//!
//! The optional envelope in [`envelope`] prefixes a record with a magic and a
//! type tag so it can be read back without out-of-band type information.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod header;
mod wire;

pub use codec::*;
pub use envelope::*;
pub use error::*;
pub use header::*;
pub use wire::{ensure_supported, is_supported, SUPPORTED_DTYPES};

pub mod element;
pub mod error;
pub mod tensor;

pub use element::*;
pub use error::*;
pub use tensor::*;

//! Encoding and decoding of individual field values.

pub mod buf_ext;
pub mod error;
pub mod field_type;
pub mod value;

pub use error::ProtocolError;
pub use field_type::FieldType;
pub use value::{FromValue, Value};

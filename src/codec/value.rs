use bytes::Bytes;

use crate::codec::error::ProtocolError;
use crate::record::Record;

/// A field's content. Integers of all widths share one variant; the field's declared
///  [FieldType](crate::codec::FieldType) determines their range and wire width.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    UInt(u64),
    String(String),
    Buffer(Bytes),
    Record(Record),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::UInt(_) => "UInt",
            Value::String(_) => "String",
            Value::Buffer(_) => "Buffer",
            Value::Record(_) => "Record",
        }
    }
}

macro_rules! uint_value_impl {
    ($ty:ty, $field_type:literal) => {
        impl From<$ty> for Value {
            fn from(value: $ty) -> Value {
                Value::UInt(value.into())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<$ty, ProtocolError> {
                match value {
                    Value::UInt(n) => <$ty>::try_from(*n)
                        .map_err(|_| ProtocolError::Range {
                            field_type: $field_type,
                            value: *n as i128,
                            max: <$ty>::MAX as u64,
                        }),
                    other => Err(ProtocolError::TypeMismatch {
                        expected: $field_type,
                        actual: other.type_name(),
                    }),
                }
            }
        }
    }
}

/// Typed access to a [Value]
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ProtocolError>;
}

uint_value_impl!(u8, "UInt8");
uint_value_impl!(u16, "UInt16");
uint_value_impl!(u32, "UInt32");
uint_value_impl!(u64, "UInt64");

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Value {
        Value::Buffer(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Value {
        Value::Record(value)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<String, ProtocolError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(ProtocolError::TypeMismatch { expected: "String", actual: other.type_name() }),
        }
    }
}

impl FromValue for Bytes {
    fn from_value(value: &Value) -> Result<Bytes, ProtocolError> {
        match value {
            Value::Buffer(b) => Ok(b.clone()),
            other => Err(ProtocolError::TypeMismatch { expected: "Buffer", actual: other.type_name() }),
        }
    }
}

impl FromValue for Record {
    fn from_value(value: &Value) -> Result<Record, ProtocolError> {
        match value {
            Value::Record(r) => Ok(r.clone()),
            other => Err(ProtocolError::TypeMismatch { expected: "Record", actual: other.type_name() }),
        }
    }
}

use std::fmt::{Display, Formatter};

use bytes::{Buf, BufMut};

use crate::codec::buf_ext::{BufExt, BufMutExt};
use crate::codec::error::ProtocolError;
use crate::codec::value::Value;
use crate::record::{Record, Schema};

/// The wire representation of a single field. Integers are fixed width and big endian, strings
///  and buffers are prefixed with their length as a u32.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FieldType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    String,
    Buffer,
    /// a nested composite record with its own schema
    Record(&'static Schema),
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Record(schema) => write!(f, "Record<{}>", schema.name),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::UInt8 => "UInt8",
            FieldType::UInt16 => "UInt16",
            FieldType::UInt32 => "UInt32",
            FieldType::UInt64 => "UInt64",
            FieldType::String => "String",
            FieldType::Buffer => "Buffer",
            FieldType::Record(schema) => schema.name,
        }
    }

    /// the largest value an integer field can hold, `None` for non-integer types
    pub fn max_uint(&self) -> Option<u64> {
        match self {
            FieldType::UInt8 => Some(u8::MAX as u64),
            FieldType::UInt16 => Some(u16::MAX as u64),
            FieldType::UInt32 => Some(u32::MAX as u64),
            FieldType::UInt64 => Some(u64::MAX),
            _ => None,
        }
    }

    /// Creates an integer value for this field type, checking it against the type's range. This
    ///  is the entry point for callers that hold numbers of some wider (or signed) type.
    pub fn uint(&self, value: impl Into<i128>) -> Result<Value, ProtocolError> {
        let value = value.into();
        let max = self.max_uint()
            .ok_or(ProtocolError::TypeMismatch { expected: self.name(), actual: "UInt" })?;

        if value < 0 || value > max as i128 {
            return Err(ProtocolError::Range {
                field_type: self.name(),
                value,
                max,
            });
        }
        Ok(Value::UInt(value as u64))
    }

    /// Checks that a value can be stored in a field of this type.
    pub fn check(&self, value: &Value) -> Result<(), ProtocolError> {
        match (self, value) {
            (FieldType::UInt8 | FieldType::UInt16 | FieldType::UInt32 | FieldType::UInt64, Value::UInt(n)) => {
                self.uint(*n).map(|_| ())
            }
            (FieldType::String, Value::String(_)) => Ok(()),
            (FieldType::Buffer, Value::Buffer(_)) => Ok(()),
            (FieldType::Record(schema), Value::Record(record)) => record.expect_schema(schema),
            (_, value) => Err(ProtocolError::TypeMismatch {
                expected: self.name(),
                actual: value.type_name(),
            }),
        }
    }

    pub fn encode(&self, value: &Value, buf: &mut impl BufMut) -> Result<(), ProtocolError> {
        self.check(value)?;

        match value {
            Value::UInt(n) => {
                let n = *n;
                match self {
                    FieldType::UInt8 => buf.put_u8(n as u8),
                    FieldType::UInt16 => buf.put_u16(n as u16),
                    FieldType::UInt32 => buf.put_u32(n as u32),
                    _ => buf.put_u64(n),
                }
            }
            Value::String(s) => buf.put_string(s)?,
            Value::Buffer(b) => buf.put_length_prefixed(b)?,
            Value::Record(record) => record.ser(buf)?,
        }
        Ok(())
    }

    pub fn decode(&self, buf: &mut impl Buf) -> Result<Value, ProtocolError> {
        let value = match self {
            FieldType::UInt8 => Value::UInt(buf.try_read_u8()?.into()),
            FieldType::UInt16 => Value::UInt(buf.try_read_u16()?.into()),
            FieldType::UInt32 => Value::UInt(buf.try_read_u32()?.into()),
            FieldType::UInt64 => Value::UInt(buf.try_read_u64()?),
            FieldType::String => Value::String(buf.try_read_string()?),
            FieldType::Buffer => Value::Buffer(buf.try_read_length_prefixed()?),
            FieldType::Record(schema) => Value::Record(Record::deser(schema, buf)?),
        };
        Ok(value)
    }
}

use std::fmt::{Debug, Formatter};

use bytes::{Buf, BufMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::codec::buf_ext::BufExt;
use crate::codec::{FromValue, ProtocolError, Value};
use crate::record::{Fields, FieldSpec, Schema};

/// The flag preceding every optional field on the wire
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
enum Presence {
    Absent = 0,
    Present = 1,
}

/// An instance of a [Schema]: one slot per declared field, each either holding a value of the
///  field's type or being absent.
///
/// Construction is permissive to allow building a record incrementally - required fields may be
///  absent until the record is serialized. Values are type and range checked when they are set,
///  and there is no way to make a field absent again once it was set.
#[derive(Clone, Eq, PartialEq)]
pub struct Record {
    schema: &'static Schema,
    values: Vec<Option<Value>>,
}

impl Debug for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct(self.schema.name);
        for (spec, value) in self.schema.fields.iter().zip(&self.values) {
            match value {
                None => {}
                Some(Value::UInt(n)) => { s.field(spec.name, n); }
                Some(Value::String(v)) => { s.field(spec.name, v); }
                Some(Value::Buffer(b)) => { s.field(spec.name, b); }
                Some(Value::Record(r)) => { s.field(spec.name, r); }
            }
        }
        s.finish()
    }
}

impl Record {
    pub fn new(schema: &'static Schema) -> Record {
        Record {
            schema,
            values: vec![None; schema.fields.len()],
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    fn spec(&self, name: &str) -> Result<(usize, &'static FieldSpec), ProtocolError> {
        let schema = self.schema;
        match schema.field_index(name) {
            Some(idx) => Ok((idx, &schema.fields[idx])),
            None => Err(ProtocolError::UnknownField {
                schema: schema.name,
                field: name.to_string(),
            }),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ProtocolError> {
        let (idx, spec) = self.spec(name)?;
        let value = value.into();
        spec.field_type.check(&value)?;
        self.values[idx] = Some(value);
        Ok(())
    }

    /// convenience for typed conversions: `None` leaves the field untouched
    pub fn set_optional<V: Into<Value>>(&mut self, name: &str, value: Option<V>) -> Result<(), ProtocolError> {
        match value {
            Some(value) => self.set(name, value),
            None => self.spec(name).map(|_| ()),
        }
    }

    /// Sets an integer field from a number of arbitrary (signed) width, failing with
    ///  [ProtocolError::Range] if it does not fit the field's declared width.
    pub fn set_uint(&mut self, name: &str, value: impl Into<i128>) -> Result<(), ProtocolError> {
        let (_, spec) = self.spec(name)?;
        let value = spec.field_type.uint(value)?;
        self.set(name, value)
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Record, ProtocolError> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<Option<&Value>, ProtocolError> {
        let (idx, _) = self.spec(name)?;
        Ok(self.values[idx].as_ref())
    }

    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<Option<T>, ProtocolError> {
        self.get(name)?
            .map(T::from_value)
            .transpose()
    }

    pub fn require<T: FromValue>(&self, name: &str) -> Result<T, ProtocolError> {
        let (_, spec) = self.spec(name)?;
        self.get_as(name)?
            .ok_or(ProtocolError::MissingRequiredField {
                schema: self.schema.name,
                field: spec.name,
            })
    }

    pub fn get_nested<T: Fields>(&self, name: &str) -> Result<Option<T>, ProtocolError> {
        match self.get(name)? {
            None => Ok(None),
            Some(Value::Record(record)) => T::from_record(record).map(Some),
            Some(other) => Err(ProtocolError::TypeMismatch {
                expected: T::schema().name,
                actual: other.type_name(),
            }),
        }
    }

    pub fn expect_schema(&self, schema: &Schema) -> Result<(), ProtocolError> {
        if self.schema != schema {
            return Err(ProtocolError::SchemaMismatch {
                expected: schema.name,
                actual: self.schema.name,
            });
        }
        Ok(())
    }

    /// Checks that all required fields are set, recursing into nested records.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        for (spec, value) in self.schema.fields.iter().zip(&self.values) {
            match value {
                None if !spec.optional => {
                    return Err(ProtocolError::MissingRequiredField {
                        schema: self.schema.name,
                        field: spec.name,
                    });
                }
                Some(Value::Record(nested)) => nested.validate()?,
                _ => {}
            }
        }
        Ok(())
    }

    /// The record is validated before anything is written, so a missing required field leaves
    ///  the buffer untouched.
    pub fn ser(&self, buf: &mut impl BufMut) -> Result<(), ProtocolError> {
        self.validate()?;

        for (spec, value) in self.schema.fields.iter().zip(&self.values) {
            if spec.optional {
                match value {
                    Some(value) => {
                        buf.put_u8(Presence::Present.into());
                        spec.field_type.encode(value, buf)?;
                    }
                    None => buf.put_u8(Presence::Absent.into()),
                }
            }
            else if let Some(value) = value {
                spec.field_type.encode(value, buf)?;
            }
        }
        Ok(())
    }

    pub fn deser(schema: &'static Schema, buf: &mut impl Buf) -> Result<Record, ProtocolError> {
        let mut values = Vec::with_capacity(schema.fields.len());

        for spec in schema.fields {
            let is_present = if spec.optional {
                let flag = buf.try_read_u8()?;
                match Presence::try_from(flag) {
                    Ok(presence) => presence == Presence::Present,
                    Err(e) => return Err(ProtocolError::invalid_encoding(
                        format!("invalid presence flag {} for {}.{}", e.number, schema.name, spec.name))),
                }
            }
            else {
                true
            };

            if is_present {
                values.push(Some(spec.field_type.decode(buf)?));
            }
            else {
                values.push(None);
            }
        }

        Ok(Record {
            schema,
            values,
        })
    }
}

#[cfg(test)]
mod test {
    use bytes::{Bytes, BytesMut};
    use rstest::rstest;

    use crate::codec::FieldType;

    use super::*;

    static INNER: Schema = Schema {
        name: "Inner",
        fields: &[
            FieldSpec::required("port", FieldType::UInt16),
        ],
    };

    static OUTER: Schema = Schema {
        name: "Outer",
        fields: &[
            FieldSpec::required("name", FieldType::String),
            FieldSpec::required("port", FieldType::UInt16),
            FieldSpec::optional("code", FieldType::UInt8),
            FieldSpec::optional("inner", FieldType::Record(&INNER)),
            FieldSpec::optional("payload", FieldType::Buffer),
        ],
    };

    fn complete_outer() -> Record {
        Record::new(&OUTER)
            .with("name", "abc").unwrap()
            .with("port", 80u16).unwrap()
            .with("code", 7u8).unwrap()
            .with("inner", Record::new(&INNER).with("port", 1000u16).unwrap()).unwrap()
            .with("payload", Bytes::from_static(b"\x01\x02")).unwrap()
    }

    fn minimal_outer() -> Record {
        Record::new(&OUTER)
            .with("name", "abc").unwrap()
            .with("port", 80u16).unwrap()
    }

    #[test]
    fn test_ser_wire_format() {
        let mut buf = BytesMut::new();
        complete_outer().ser(&mut buf).unwrap();
        assert_eq!(&buf, b"\0\0\0\x03abc\0\x50\x01\x07\x01\x03\xe8\x01\0\0\0\x02\x01\x02".as_slice());

        let mut buf = BytesMut::new();
        minimal_outer().ser(&mut buf).unwrap();
        assert_eq!(&buf, b"\0\0\0\x03abc\0\x50\0\0\0".as_slice());
    }

    #[rstest]
    #[case::complete(complete_outer())]
    #[case::all_optional_absent(minimal_outer())]
    #[case::some_optional_absent(minimal_outer().with("payload", Bytes::new()).unwrap())]
    fn test_ser_deser(#[case] record: Record) {
        let mut buf = BytesMut::new();
        record.ser(&mut buf).unwrap();

        let mut b: &[u8] = &buf;
        let deser = Record::deser(&OUTER, &mut b).unwrap();
        assert!(b.is_empty());
        assert_eq!(deser, record);
    }

    #[test]
    fn test_ser_missing_required_field() {
        let record = Record::new(&OUTER)
            .with("name", "abc").unwrap();

        let mut buf = BytesMut::new();
        assert_eq!(record.ser(&mut buf), Err(ProtocolError::MissingRequiredField { schema: "Outer", field: "port" }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_ser_missing_required_nested_field() {
        let record = minimal_outer()
            .with("inner", Record::new(&INNER)).unwrap();

        let mut buf = BytesMut::new();
        assert_eq!(record.ser(&mut buf), Err(ProtocolError::MissingRequiredField { schema: "Inner", field: "port" }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_deser_truncated_at_every_position() {
        let mut buf = BytesMut::new();
        complete_outer().ser(&mut buf).unwrap();

        for len in 0..buf.len() {
            let mut b = &buf[..len];
            match Record::deser(&OUTER, &mut b) {
                Err(e) => assert!(e.is_truncated(), "{} bytes: {}", len, e),
                Ok(r) => panic!("{} bytes deserialized to {:?}", len, r),
            }
        }
    }

    #[test]
    fn test_deser_invalid_presence_flag() {
        let mut b: &[u8] = b"\0\0\0\x03abc\0\x50\x02";
        match Record::deser(&OUTER, &mut b) {
            Err(ProtocolError::InvalidEncoding { reason }) => assert!(reason.contains("Outer.code"), "{}", reason),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[rstest]
    #[case::zero(0, true)]
    #[case::max(65535, true)]
    #[case::overflow(65536, false)]
    #[case::negative(-1, false)]
    fn test_set_uint_range(#[case] value: i64, #[case] accepted: bool) {
        let mut record = Record::new(&OUTER);
        match record.set_uint("port", value) {
            Ok(()) => {
                assert!(accepted);
                assert_eq!(record.get_as::<u16>("port").unwrap(), Some(value as u16));
            }
            Err(ProtocolError::Range { .. }) => {
                assert!(!accepted);
                assert_eq!(record.get("port").unwrap(), None);
            }
            Err(e) => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn test_set_checks() {
        let mut record = Record::new(&OUTER);
        assert!(matches!(record.set("port", 65536u32), Err(ProtocolError::Range { .. })));
        assert!(matches!(record.set("port", "80"), Err(ProtocolError::TypeMismatch { .. })));
        assert!(matches!(record.set("no_such_field", 1u8), Err(ProtocolError::UnknownField { .. })));
        assert!(matches!(record.set("inner", Record::new(&OUTER)), Err(ProtocolError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_set_overwrites_absence() {
        let mut record = minimal_outer();
        assert_eq!(record.get("code").unwrap(), None);
        record.set_optional::<u8>("code", None).unwrap();
        assert_eq!(record.get("code").unwrap(), None);
        record.set_optional("code", Some(3u8)).unwrap();
        assert_eq!(record.get_as::<u8>("code").unwrap(), Some(3));
    }

    #[test]
    fn test_require() {
        let record = Record::new(&OUTER).with("name", "x").unwrap();
        assert_eq!(record.require::<String>("name"), Ok("x".to_string()));
        assert_eq!(record.require::<u16>("port"), Err(ProtocolError::MissingRequiredField { schema: "Outer", field: "port" }));
    }

    #[test]
    fn test_equality() {
        assert_eq!(minimal_outer(), minimal_outer());
        assert_ne!(minimal_outer(), complete_outer());
        assert_ne!(minimal_outer(), minimal_outer().with("code", 0u8).unwrap());
        assert_ne!(Record::new(&INNER), Record::new(&OUTER));
    }

    #[test]
    fn test_debug() {
        let formatted = format!("{:?}", minimal_outer().with("inner", Record::new(&INNER).with("port", 1u16).unwrap()).unwrap());
        assert_eq!(formatted, "Outer { name: \"abc\", port: 80, inner: Inner { port: 1 } }");
    }
}

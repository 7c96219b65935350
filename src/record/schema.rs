use crate::codec::FieldType;

/// A named, typed field in a [Schema]. Optional fields are preceded by a presence flag on the
///  wire, required fields are not.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub optional: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, field_type: FieldType) -> FieldSpec {
        FieldSpec {
            name,
            field_type,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, field_type: FieldType) -> FieldSpec {
        FieldSpec {
            name,
            field_type,
            optional: true,
        }
    }
}

/// The statically declared layout of a composite record. The order of fields is the wire order.
///
/// Schemas are `static` items, nested record fields refer to other schemas by `&'static`
///  reference.
#[derive(Debug, Eq, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter()
            .position(|f| f.name == name)
    }
}

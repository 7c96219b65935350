use crate::codec::{FieldType, ProtocolError};
use crate::packet::{PacketDefinition, PacketType};
use crate::record::{FieldSpec, Fields, Record, Schema};
use crate::vsockets::VSOCKETS_VERSION;

const SET: &str = "set";
const GET: &str = "get";

static PROMISCUOUS_LEVEL_SCHEMA: Schema = Schema {
    name: "PromiscuousLevel",
    fields: &[
        FieldSpec::optional(SET, FieldType::UInt8),
        FieldSpec::optional(GET, FieldType::UInt8),
    ],
};

static PROMISCUOUS_LEVEL: PacketDefinition = PacketDefinition {
    identifier: "vsockets.VNICPromiscuousLevelPacket",
    version: VSOCKETS_VERSION,
    schema: &PROMISCUOUS_LEVEL_SCHEMA,
};

/// Getter and setter for the promiscuity level in one message:
///
/// * the client sends it with neither field to query the current level
/// * the client sends it with `set` to change the level
/// * the server answers both with `get` holding the (new) current level, and never sets `set`
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct PromiscuousLevel {
    pub set: Option<u8>,
    pub get: Option<u8>,
}

impl PromiscuousLevel {
    pub fn query() -> PromiscuousLevel {
        Default::default()
    }

    pub fn assign(level: u8) -> PromiscuousLevel {
        PromiscuousLevel {
            set: Some(level),
            get: None,
        }
    }

    pub fn reply(level: u8) -> PromiscuousLevel {
        PromiscuousLevel {
            set: None,
            get: Some(level),
        }
    }

    pub fn is_query(&self) -> bool {
        self.set.is_none() && self.get.is_none()
    }
}

impl Fields for PromiscuousLevel {
    fn schema() -> &'static Schema {
        &PROMISCUOUS_LEVEL_SCHEMA
    }

    fn to_record(&self) -> Result<Record, ProtocolError> {
        let mut record = Record::new(Self::schema());
        record.set_optional(SET, self.set)?;
        record.set_optional(GET, self.get)?;
        Ok(record)
    }

    fn from_record(record: &Record) -> Result<PromiscuousLevel, ProtocolError> {
        record.expect_schema(Self::schema())?;
        Ok(PromiscuousLevel {
            set: record.get_as(SET)?,
            get: record.get_as(GET)?,
        })
    }
}

impl PacketType for PromiscuousLevel {
    fn definition() -> &'static PacketDefinition {
        &PROMISCUOUS_LEVEL
    }
}

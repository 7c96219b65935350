use crate::codec::{FieldType, ProtocolError};
use crate::packet::{PacketDefinition, PacketType};
use crate::record::{FieldSpec, Fields, Record, Schema};
use crate::vsockets::VSOCKETS_VERSION;

const PORT: &str = "port";
const ERROR_CODE: &str = "errorCode";
const ERROR_MESSAGE: &str = "errorMessage";

static SOCKET_OPEN_RESPONSE_SCHEMA: Schema = Schema {
    name: "SocketOpenResponse",
    fields: &[
        FieldSpec::required(PORT, FieldType::UInt16),
        FieldSpec::optional(ERROR_CODE, FieldType::UInt8),
        FieldSpec::optional(ERROR_MESSAGE, FieldType::String),
    ],
};

static SOCKET_OPEN_RESPONSE: PacketDefinition = PacketDefinition {
    identifier: "vsockets.VNICSocketOpenResponsePacket",
    version: VSOCKETS_VERSION,
    schema: &SOCKET_OPEN_RESPONSE_SCHEMA,
};

/// The reply to a [SocketOpen](crate::vsockets::SocketOpen) request. Success is signalled by
///  the absence of both error fields.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SocketOpenResponse {
    pub port: u16,
    pub error_code: Option<u8>,
    pub error_message: Option<String>,
}

impl SocketOpenResponse {
    pub fn success(port: u16) -> SocketOpenResponse {
        SocketOpenResponse {
            port,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(port: u16, error_code: u8, error_message: impl Into<String>) -> SocketOpenResponse {
        SocketOpenResponse {
            port,
            error_code: Some(error_code),
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error_code.is_some() || self.error_message.is_some()
    }
}

impl Fields for SocketOpenResponse {
    fn schema() -> &'static Schema {
        &SOCKET_OPEN_RESPONSE_SCHEMA
    }

    fn to_record(&self) -> Result<Record, ProtocolError> {
        let mut record = Record::new(Self::schema())
            .with(PORT, self.port)?;
        record.set_optional(ERROR_CODE, self.error_code)?;
        record.set_optional(ERROR_MESSAGE, self.error_message.as_deref())?;
        Ok(record)
    }

    fn from_record(record: &Record) -> Result<SocketOpenResponse, ProtocolError> {
        record.expect_schema(Self::schema())?;
        Ok(SocketOpenResponse {
            port: record.require(PORT)?,
            error_code: record.get_as(ERROR_CODE)?,
            error_message: record.get_as(ERROR_MESSAGE)?,
        })
    }
}

impl PacketType for SocketOpenResponse {
    fn definition() -> &'static PacketDefinition {
        &SOCKET_OPEN_RESPONSE
    }
}

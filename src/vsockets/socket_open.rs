use crate::codec::{FieldType, ProtocolError};
use crate::packet::{PacketDefinition, PacketType};
use crate::record::{FieldSpec, Fields, Record, Schema};
use crate::vsockets::VSOCKETS_VERSION;

const DESTINATION: &str = "destination";
const DESTINATION_PORT: &str = "destinationPort";
const SOURCE_PORT: &str = "sourcePort";

const CALLBACK_ADDRESS: &str = "callbackAddress";
const CALLBACK_PORT: &str = "callbackPort";
const CONNECT_DATA: &str = "connectData";
const LISTEN_DATA: &str = "listenData";

static SOCKET_CONNECT_DATA_SCHEMA: Schema = Schema {
    name: "SocketConnectData",
    fields: &[
        FieldSpec::required(DESTINATION, FieldType::String),
        FieldSpec::required(DESTINATION_PORT, FieldType::UInt16),
    ],
};

static SOCKET_LISTEN_DATA_SCHEMA: Schema = Schema {
    name: "SocketListenData",
    fields: &[
        FieldSpec::required(SOURCE_PORT, FieldType::UInt16),
    ],
};

static SOCKET_OPEN_SCHEMA: Schema = Schema {
    name: "SocketOpen",
    fields: &[
        FieldSpec::required(CALLBACK_ADDRESS, FieldType::String),
        FieldSpec::required(CALLBACK_PORT, FieldType::UInt16),
        FieldSpec::optional(CONNECT_DATA, FieldType::Record(&SOCKET_CONNECT_DATA_SCHEMA)),
        FieldSpec::optional(LISTEN_DATA, FieldType::Record(&SOCKET_LISTEN_DATA_SCHEMA)),
    ],
};

static SOCKET_OPEN: PacketDefinition = PacketDefinition {
    identifier: "vsockets.VNICSocketOpenPacket",
    version: VSOCKETS_VERSION,
    schema: &SOCKET_OPEN_SCHEMA,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SocketMode {
    /// an outgoing connection to a remote endpoint
    Connect,
    /// a server socket accepting connections on a local port
    Listen,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SocketConnectData {
    pub destination: String,
    pub destination_port: u16,
}

impl Fields for SocketConnectData {
    fn schema() -> &'static Schema {
        &SOCKET_CONNECT_DATA_SCHEMA
    }

    fn to_record(&self) -> Result<Record, ProtocolError> {
        Record::new(Self::schema())
            .with(DESTINATION, self.destination.as_str())?
            .with(DESTINATION_PORT, self.destination_port)
    }

    fn from_record(record: &Record) -> Result<SocketConnectData, ProtocolError> {
        record.expect_schema(Self::schema())?;
        Ok(SocketConnectData {
            destination: record.require(DESTINATION)?,
            destination_port: record.require(DESTINATION_PORT)?,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SocketListenData {
    pub source_port: u16,
}

impl Fields for SocketListenData {
    fn schema() -> &'static Schema {
        &SOCKET_LISTEN_DATA_SCHEMA
    }

    fn to_record(&self) -> Result<Record, ProtocolError> {
        Record::new(Self::schema())
            .with(SOURCE_PORT, self.source_port)
    }

    fn from_record(record: &Record) -> Result<SocketListenData, ProtocolError> {
        record.expect_schema(Self::schema())?;
        Ok(SocketListenData {
            source_port: record.require(SOURCE_PORT)?,
        })
    }
}

/// Requests opening a socket, either connecting to a remote endpoint or listening on a local
///  port. Responses and notifications about spawned connections go to the callback address.
///
/// The two payloads are independently optional on the wire, so a request can carry both or
///  neither. Such a request is neither 'connect' nor 'listen' ([SocketOpen::mode] returns
///  `None`), and it is up to the receiver to reject it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SocketOpen {
    pub callback_address: String,
    pub callback_port: u16,
    pub connect_data: Option<SocketConnectData>,
    pub listen_data: Option<SocketListenData>,
}

impl SocketOpen {
    pub fn connect(callback_address: impl Into<String>, callback_port: u16, destination: impl Into<String>, destination_port: u16) -> SocketOpen {
        SocketOpen {
            callback_address: callback_address.into(),
            callback_port,
            connect_data: Some(SocketConnectData {
                destination: destination.into(),
                destination_port,
            }),
            listen_data: None,
        }
    }

    pub fn listen(callback_address: impl Into<String>, callback_port: u16, source_port: u16) -> SocketOpen {
        SocketOpen {
            callback_address: callback_address.into(),
            callback_port,
            connect_data: None,
            listen_data: Some(SocketListenData {
                source_port,
            }),
        }
    }

    pub fn is_connect(&self) -> bool {
        self.connect_data.is_some() && self.listen_data.is_none()
    }

    pub fn is_listen(&self) -> bool {
        self.connect_data.is_none() && self.listen_data.is_some()
    }

    pub fn mode(&self) -> Option<SocketMode> {
        if self.is_connect() {
            Some(SocketMode::Connect)
        }
        else if self.is_listen() {
            Some(SocketMode::Listen)
        }
        else {
            None
        }
    }
}

impl Fields for SocketOpen {
    fn schema() -> &'static Schema {
        &SOCKET_OPEN_SCHEMA
    }

    fn to_record(&self) -> Result<Record, ProtocolError> {
        let mut record = Record::new(Self::schema())
            .with(CALLBACK_ADDRESS, self.callback_address.as_str())?
            .with(CALLBACK_PORT, self.callback_port)?;

        let connect_data = self.connect_data.as_ref()
            .map(|data| data.to_record())
            .transpose()?;
        record.set_optional(CONNECT_DATA, connect_data)?;

        let listen_data = self.listen_data.as_ref()
            .map(|data| data.to_record())
            .transpose()?;
        record.set_optional(LISTEN_DATA, listen_data)?;

        Ok(record)
    }

    fn from_record(record: &Record) -> Result<SocketOpen, ProtocolError> {
        record.expect_schema(Self::schema())?;
        Ok(SocketOpen {
            callback_address: record.require(CALLBACK_ADDRESS)?,
            callback_port: record.require(CALLBACK_PORT)?,
            connect_data: record.get_nested(CONNECT_DATA)?,
            listen_data: record.get_nested(LISTEN_DATA)?,
        })
    }
}

impl PacketType for SocketOpen {
    fn definition() -> &'static PacketDefinition {
        &SOCKET_OPEN
    }
}

use crate::codec::{FieldType, ProtocolError};
use crate::packet::{PacketDefinition, PacketType};
use crate::record::{FieldSpec, Fields, Record, Schema};
use crate::vsockets::VSOCKETS_VERSION;

const SPAWN_TCP_PORT: &str = "spawnTcpPort";
const SOURCE: &str = "source";
const SOURCE_PORT: &str = "sourcePort";
const DESTINATION: &str = "destination";
const DESTINATION_PORT: &str = "destinationPort";

static CONNECTION_SPAWNED_SCHEMA: Schema = Schema {
    name: "ConnectionSpawned",
    fields: &[
        FieldSpec::required(SPAWN_TCP_PORT, FieldType::UInt16),
        FieldSpec::required(SOURCE, FieldType::String),
        FieldSpec::required(SOURCE_PORT, FieldType::UInt16),
        FieldSpec::required(DESTINATION, FieldType::String),
        FieldSpec::required(DESTINATION_PORT, FieldType::UInt16),
    ],
};

static CONNECTION_SPAWNED: PacketDefinition = PacketDefinition {
    identifier: "vsockets.VNICConnectionSpawnedPacket",
    version: VSOCKETS_VERSION,
    schema: &CONNECTION_SPAWNED_SCHEMA,
};

/// Sent without a request when a listening socket accepts a connection. Nothing is sent back.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConnectionSpawned {
    /// the local port of the spawned connection
    pub spawn_tcp_port: u16,
    pub source: String,
    pub source_port: u16,
    pub destination: String,
    pub destination_port: u16,
}

impl Fields for ConnectionSpawned {
    fn schema() -> &'static Schema {
        &CONNECTION_SPAWNED_SCHEMA
    }

    fn to_record(&self) -> Result<Record, ProtocolError> {
        Record::new(Self::schema())
            .with(SPAWN_TCP_PORT, self.spawn_tcp_port)?
            .with(SOURCE, self.source.as_str())?
            .with(SOURCE_PORT, self.source_port)?
            .with(DESTINATION, self.destination.as_str())?
            .with(DESTINATION_PORT, self.destination_port)
    }

    fn from_record(record: &Record) -> Result<ConnectionSpawned, ProtocolError> {
        record.expect_schema(Self::schema())?;
        Ok(ConnectionSpawned {
            spawn_tcp_port: record.require(SPAWN_TCP_PORT)?,
            source: record.require(SOURCE)?,
            source_port: record.require(SOURCE_PORT)?,
            destination: record.require(DESTINATION)?,
            destination_port: record.require(DESTINATION_PORT)?,
        })
    }
}

impl PacketType for ConnectionSpawned {
    fn definition() -> &'static PacketDefinition {
        &CONNECTION_SPAWNED
    }
}

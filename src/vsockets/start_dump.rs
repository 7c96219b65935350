use crate::codec::ProtocolError;
use crate::packet::{PacketDefinition, PacketType};
use crate::record::{Fields, Record, Schema};
use crate::vsockets::VSOCKETS_VERSION;

static START_DUMP_SCHEMA: Schema = Schema {
    name: "StartDump",
    fields: &[],
};

static START_DUMP: PacketDefinition = PacketDefinition {
    identifier: "vsockets.VNICStartDumpPacket",
    version: VSOCKETS_VERSION,
    schema: &START_DUMP_SCHEMA,
};

/// Asks the server to start a packet capture dump for the session. The message has no content.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct StartDump;

impl Fields for StartDump {
    fn schema() -> &'static Schema {
        &START_DUMP_SCHEMA
    }

    fn to_record(&self) -> Result<Record, ProtocolError> {
        Ok(Record::new(Self::schema()))
    }

    fn from_record(record: &Record) -> Result<StartDump, ProtocolError> {
        record.expect_schema(Self::schema())?;
        Ok(StartDump)
    }
}

impl PacketType for StartDump {
    fn definition() -> &'static PacketDefinition {
        &START_DUMP
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn test_ser_deser() {
        let mut buf = BytesMut::new();
        StartDump.ser_packet(&mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"\0\0\0\x1cvsockets.VNICStartDumpPacket\0\0\0\x031.0".as_slice());

        let mut b: &[u8] = &buf;
        assert_eq!(StartDump::deser_packet(&mut b).unwrap(), StartDump);
        assert!(b.is_empty());
    }
}

use bytes::{Buf, BytesMut};

use crate::codec::ProtocolError;
use crate::packet::envelope::{EnvelopeHeader, Packet};
use crate::record::{Fields, Record, Schema};

/// The (identifier, version) pair is sent in each packet's envelope, and it is the key the
///  receiving side uses to look up the schema for decoding. Matching is exact: there is no
///  compatibility between versions.
///
/// Identifiers follow a `domain.TypeName` convention.
#[derive(Debug, Eq, PartialEq)]
pub struct PacketDefinition {
    pub identifier: &'static str,
    pub version: &'static str,
    pub schema: &'static Schema,
}

/// A typed message that is sent as a packet of its own.
pub trait PacketType: Fields {
    fn definition() -> &'static PacketDefinition;

    fn to_packet(&self) -> Result<Packet, ProtocolError> {
        Packet::new(Self::definition(), self.to_record()?)
    }

    fn ser_packet(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        self.to_packet()?
            .ser(buf)
    }

    /// Decodes a packet that must be of this type, regardless of any registry. Packets with a
    ///  different identifier or version are rejected as [ProtocolError::UnknownPacketType].
    fn deser_packet(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        let definition = Self::definition();

        let header = EnvelopeHeader::try_read(buf)?;
        if !header.matches(definition) {
            return Err(header.unknown());
        }

        let record = Record::deser(definition.schema, buf)?;
        Self::from_record(&record)
    }
}

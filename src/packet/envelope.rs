use bytes::{Buf, BufMut, BytesMut};

use crate::codec::buf_ext::{BufExt, BufMutExt};
use crate::codec::ProtocolError;
use crate::packet::definition::{PacketDefinition, PacketType};
use crate::record::Record;

/// The identifying part at the start of every packet:
///
/// ```ascii
/// [identifier: u32 length + UTF-8] [version: u32 length + UTF-8] [record payload ...]
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EnvelopeHeader {
    pub identifier: String,
    pub version: String,
}

impl EnvelopeHeader {
    pub fn try_read(buf: &mut impl Buf) -> Result<EnvelopeHeader, ProtocolError> {
        let identifier = buf.try_read_string()?;
        let version = buf.try_read_string()?;
        Ok(EnvelopeHeader {
            identifier,
            version,
        })
    }

    pub fn write(definition: &PacketDefinition, buf: &mut impl BufMut) -> Result<(), ProtocolError> {
        buf.put_string(definition.identifier)?;
        buf.put_string(definition.version)
    }

    pub fn matches(&self, definition: &PacketDefinition) -> bool {
        self.identifier == definition.identifier && self.version == definition.version
    }

    pub fn unknown(self) -> ProtocolError {
        ProtocolError::UnknownPacketType {
            identifier: self.identifier,
            version: self.version,
        }
    }
}

/// A record together with the packet definition it is sent as.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Packet {
    definition: &'static PacketDefinition,
    record: Record,
}

impl Packet {
    pub fn new(definition: &'static PacketDefinition, record: Record) -> Result<Packet, ProtocolError> {
        record.expect_schema(definition.schema)?;
        Ok(Packet {
            definition,
            record,
        })
    }

    pub fn definition(&self) -> &'static PacketDefinition {
        self.definition
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn is<T: PacketType>(&self) -> bool {
        self.definition == T::definition()
    }

    pub fn to_typed<T: PacketType>(&self) -> Result<T, ProtocolError> {
        if !self.is::<T>() {
            return Err(ProtocolError::SchemaMismatch {
                expected: T::definition().identifier,
                actual: self.definition.identifier,
            });
        }
        T::from_record(&self.record)
    }

    /// Appends the packet to the buffer. If serialization fails, the buffer is left as it was.
    pub fn ser(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        let start = buf.len();

        let result = EnvelopeHeader::write(self.definition, buf)
            .and_then(|_| self.record.ser(buf));
        if result.is_err() {
            buf.truncate(start);
        }
        result
    }
}

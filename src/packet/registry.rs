use std::collections::hash_map::Entry;

use anyhow::anyhow;
use bytes::Buf;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::codec::ProtocolError;
use crate::packet::definition::{PacketDefinition, PacketType};
use crate::packet::envelope::{EnvelopeHeader, Packet};
use crate::record::Record;

/// Maps the (identifier, version) pairs a receiver understands to their packet definitions.
#[derive(Debug, Default)]
pub struct PacketRegistry {
    /// identifier -> version -> definition
    definitions: FxHashMap<String, FxHashMap<String, &'static PacketDefinition>>,
}

impl PacketRegistry {
    pub fn new() -> PacketRegistry {
        Default::default()
    }

    pub fn register(&mut self, definition: &'static PacketDefinition) -> anyhow::Result<()> {
        match self.definitions
            .entry(definition.identifier.to_string())
            .or_default()
            .entry(definition.version.to_string())
        {
            Entry::Occupied(_) => {
                Err(anyhow!("registering a second packet definition for {:?} version {:?}", definition.identifier, definition.version))
            }
            Entry::Vacant(e) => {
                e.insert(definition);
                Ok(())
            }
        }
    }

    pub fn register_type<T: PacketType>(&mut self) -> anyhow::Result<()> {
        self.register(T::definition())
    }

    pub fn lookup(&self, identifier: &str, version: &str) -> Option<&'static PacketDefinition> {
        self.definitions.get(identifier)
            .and_then(|versions| versions.get(version))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.values()
            .map(|versions| versions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads a packet's envelope header, resolves its definition and decodes the record.
    pub fn deser(&self, buf: &mut impl Buf) -> Result<Packet, ProtocolError> {
        let header = EnvelopeHeader::try_read(buf)?;
        let definition = match self.lookup(&header.identifier, &header.version) {
            Some(definition) => definition,
            None => return Err(header.unknown()),
        };
        trace!(identifier = definition.identifier, version = definition.version, "decoding packet");

        let record = Record::deser(definition.schema, buf)?;
        Packet::new(definition, record)
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;
    use rstest::rstest;

    use crate::codec::FieldType;
    use crate::record::{FieldSpec, Schema};

    use super::*;

    static COUNTER_SCHEMA: Schema = Schema {
        name: "Counter",
        fields: &[
            FieldSpec::optional("value", FieldType::UInt32),
        ],
    };

    static COUNTER_V1: PacketDefinition = PacketDefinition {
        identifier: "test.Counter",
        version: "1.0",
        schema: &COUNTER_SCHEMA,
    };

    static COUNTER_V2: PacketDefinition = PacketDefinition {
        identifier: "test.Counter",
        version: "2.0",
        schema: &COUNTER_SCHEMA,
    };

    fn registry() -> PacketRegistry {
        let mut registry = PacketRegistry::new();
        registry.register(&COUNTER_V1).unwrap();
        registry
    }

    #[test]
    fn test_register_twice() {
        let mut registry = registry();
        assert!(registry.register(&COUNTER_V1).is_err());
        registry.register(&COUNTER_V2).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[rstest]
    #[case::registered("test.Counter", "1.0", true)]
    #[case::other_version("test.Counter", "1.1", false)]
    #[case::other_identifier("test.Counte", "1.0", false)]
    fn test_lookup(#[case] identifier: &str, #[case] version: &str, #[case] found: bool) {
        assert_eq!(registry().lookup(identifier, version).is_some(), found);
    }

    #[test]
    fn test_deser_registered() {
        let packet = Packet::new(&COUNTER_V1, Record::new(&COUNTER_SCHEMA).with("value", 9u32).unwrap()).unwrap();
        let mut buf = BytesMut::new();
        packet.ser(&mut buf).unwrap();
        buf.extend_from_slice(b"next");

        let mut b: &[u8] = &buf;
        assert_eq!(registry().deser(&mut b).unwrap(), packet);
        assert_eq!(b, b"next");
    }

    #[test]
    fn test_deser_unknown_version() {
        let packet = Packet::new(&COUNTER_V2, Record::new(&COUNTER_SCHEMA)).unwrap();
        let mut buf = BytesMut::new();
        packet.ser(&mut buf).unwrap();

        let mut b: &[u8] = &buf;
        assert_eq!(registry().deser(&mut b), Err(ProtocolError::UnknownPacketType {
            identifier: "test.Counter".to_string(),
            version: "2.0".to_string(),
        }));
    }
}

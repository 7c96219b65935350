//! Packets: records wrapped in an envelope that identifies their type and version.

pub mod decoder;
pub mod definition;
pub mod envelope;
pub mod registry;

pub use decoder::PacketDecoder;
pub use definition::{PacketDefinition, PacketType};
pub use envelope::{EnvelopeHeader, Packet};
pub use registry::PacketRegistry;

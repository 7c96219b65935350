use bytes::{Buf, BytesMut};

use crate::codec::ProtocolError;
use crate::packet::{Packet, PacketDefinition, PacketRegistry, PacketType};
use crate::vsockets::{ConnectionSpawned, PromiscuousLevel, SocketOpen, SocketOpenResponse, StartDump};

/// All packets exchanged on a VNIC socket control channel.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VnicControlMessage {
    SocketOpen(SocketOpen),
    SocketOpenResponse(SocketOpenResponse),
    ConnectionSpawned(ConnectionSpawned),
    StartDump(StartDump),
    PromiscuousLevel(PromiscuousLevel),
}

/// The kinds of messages that are sent as a reply to a request. Replies carry no request id,
///  they are matched to requests by order.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResponseKind {
    SocketOpenResponse,
    PromiscuousLevel,
}

/// a registry with all VNIC control packet types
pub fn vnic_registry() -> anyhow::Result<PacketRegistry> {
    let mut registry = PacketRegistry::new();
    registry.register_type::<SocketOpen>()?;
    registry.register_type::<SocketOpenResponse>()?;
    registry.register_type::<ConnectionSpawned>()?;
    registry.register_type::<StartDump>()?;
    registry.register_type::<PromiscuousLevel>()?;
    Ok(registry)
}

impl VnicControlMessage {
    pub fn definition(&self) -> &'static PacketDefinition {
        match self {
            VnicControlMessage::SocketOpen(_) => SocketOpen::definition(),
            VnicControlMessage::SocketOpenResponse(_) => SocketOpenResponse::definition(),
            VnicControlMessage::ConnectionSpawned(_) => ConnectionSpawned::definition(),
            VnicControlMessage::StartDump(_) => StartDump::definition(),
            VnicControlMessage::PromiscuousLevel(_) => PromiscuousLevel::definition(),
        }
    }

    pub fn to_packet(&self) -> Result<Packet, ProtocolError> {
        match self {
            VnicControlMessage::SocketOpen(msg) => msg.to_packet(),
            VnicControlMessage::SocketOpenResponse(msg) => msg.to_packet(),
            VnicControlMessage::ConnectionSpawned(msg) => msg.to_packet(),
            VnicControlMessage::StartDump(msg) => msg.to_packet(),
            VnicControlMessage::PromiscuousLevel(msg) => msg.to_packet(),
        }
    }

    pub fn ser(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        self.to_packet()?
            .ser(buf)
    }

    pub fn from_packet(packet: &Packet) -> Result<VnicControlMessage, ProtocolError> {
        let msg = if packet.is::<SocketOpen>() {
            VnicControlMessage::SocketOpen(packet.to_typed()?)
        }
        else if packet.is::<SocketOpenResponse>() {
            VnicControlMessage::SocketOpenResponse(packet.to_typed()?)
        }
        else if packet.is::<ConnectionSpawned>() {
            VnicControlMessage::ConnectionSpawned(packet.to_typed()?)
        }
        else if packet.is::<StartDump>() {
            VnicControlMessage::StartDump(packet.to_typed()?)
        }
        else if packet.is::<PromiscuousLevel>() {
            VnicControlMessage::PromiscuousLevel(packet.to_typed()?)
        }
        else {
            let definition = packet.definition();
            return Err(ProtocolError::UnknownPacketType {
                identifier: definition.identifier.to_string(),
                version: definition.version.to_string(),
            });
        };
        Ok(msg)
    }

    pub fn deser(registry: &PacketRegistry, buf: &mut impl Buf) -> Result<VnicControlMessage, ProtocolError> {
        let packet = registry.deser(buf)?;
        Self::from_packet(&packet)
    }

    /// the kind of reply a client must wait for after sending this message
    pub fn expected_response(&self) -> Option<ResponseKind> {
        match self {
            VnicControlMessage::SocketOpen(_) => Some(ResponseKind::SocketOpenResponse),
            VnicControlMessage::PromiscuousLevel(_) => Some(ResponseKind::PromiscuousLevel),
            _ => None,
        }
    }

    /// the kind of reply this message represents when a client receives it
    pub fn response_kind(&self) -> Option<ResponseKind> {
        match self {
            VnicControlMessage::SocketOpenResponse(_) => Some(ResponseKind::SocketOpenResponse),
            VnicControlMessage::PromiscuousLevel(_) => Some(ResponseKind::PromiscuousLevel),
            _ => None,
        }
    }
}

macro_rules! from_impl {
    ($ty:ident) => {
        impl From<$ty> for VnicControlMessage {
            fn from(value: $ty) -> VnicControlMessage {
                VnicControlMessage::$ty(value)
            }
        }
    }
}

from_impl!(SocketOpen);
from_impl!(SocketOpenResponse);
from_impl!(ConnectionSpawned);
from_impl!(StartDump);
from_impl!(PromiscuousLevel);

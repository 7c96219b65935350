use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::ProtocolError;
use crate::packet::envelope::Packet;
use crate::packet::registry::PacketRegistry;

/// Incremental decoding of packets from a byte stream.
///
/// Packets are self-delimiting, so there is no framing: bytes are buffered until a packet decodes
///  successfully. [ProtocolError::TruncatedInput] means 'wait for more data', any other error
///  means the stream is corrupt and can not be resynchronized.
pub struct PacketDecoder {
    registry: Arc<PacketRegistry>,
    buf: BytesMut,
    max_packet_size: usize,
}

impl PacketDecoder {
    pub fn new(registry: Arc<PacketRegistry>, max_packet_size: usize) -> PacketDecoder {
        PacketDecoder {
            registry,
            buf: BytesMut::new(),
            max_packet_size,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// number of bytes received but not yet decoded
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn next_packet(&mut self) -> Result<Option<Packet>, ProtocolError> {
        if self.buf.is_empty() {
            return Ok(None);
        }

        let mut b: &[u8] = &self.buf;
        match self.registry.deser(&mut b) {
            Ok(packet) => {
                let consumed = self.buf.len() - b.len();
                self.check_size(consumed)?;

                self.buf.advance(consumed);
                trace!(consumed, buffered = self.buf.len(), "decoded packet {:?}", packet.record());
                Ok(Some(packet))
            }
            Err(e) if e.is_truncated() => {
                self.check_size(self.buf.len())?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn check_size(&self, packet_size: usize) -> Result<(), ProtocolError> {
        if packet_size > self.max_packet_size {
            return Err(ProtocolError::invalid_encoding(
                format!("packet exceeds maximum size of {} bytes", self.max_packet_size)));
        }
        Ok(())
    }
}

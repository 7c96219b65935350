use std::sync::Arc;

use anyhow::bail;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::channel::config::ChannelConfig;
use crate::packet::{PacketDecoder, PacketRegistry};
use crate::vsockets::VnicControlMessage;

/// Reads control messages from a byte stream.
pub struct PacketReader<R> {
    reader: R,
    decoder: PacketDecoder,
    chunk: Vec<u8>,
}

impl <R: AsyncRead + Unpin> PacketReader<R> {
    pub fn new(reader: R, registry: Arc<PacketRegistry>, config: &ChannelConfig) -> PacketReader<R> {
        PacketReader {
            reader,
            decoder: PacketDecoder::new(registry, config.max_packet_size),
            chunk: vec![0u8; config.read_chunk_size],
        }
    }

    /// Returns the next message, or `None` if the stream was closed between two messages.
    ///
    /// This is cancel safe: if the returned future is dropped before completion, no data is lost.
    pub async fn next_message(&mut self) -> anyhow::Result<Option<VnicControlMessage>> {
        loop {
            if let Some(packet) = self.decoder.next_packet()? {
                let msg = VnicControlMessage::from_packet(&packet)?;
                trace!("received {:?}", msg);
                return Ok(Some(msg));
            }

            let num_read = self.reader.read(&mut self.chunk).await?;
            if num_read == 0 {
                if self.decoder.buffered() > 0 {
                    bail!("stream closed in the middle of a packet ({} bytes pending)", self.decoder.buffered());
                }
                return Ok(None);
            }
            self.decoder.update(&self.chunk[..num_read]);
        }
    }
}

/// Writes control messages to a byte stream.
///
/// A send that fails or is cancelled part way leaves an incomplete packet on the stream, after
///  which the peer can not decode anything that follows. The writer is then broken, and all
///  further sends fail.
pub struct PacketWriter<W> {
    writer: W,
    buf: BytesMut,
    is_broken: bool,
}

impl <W: AsyncWrite + Unpin> PacketWriter<W> {
    pub fn new(writer: W) -> PacketWriter<W> {
        PacketWriter {
            writer,
            buf: BytesMut::new(),
            is_broken: false,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.is_broken
    }

    pub async fn send(&mut self, msg: &VnicControlMessage) -> anyhow::Result<()> {
        trace!("sending {:?}", msg);

        if self.is_broken {
            bail!("an earlier send did not complete, the stream is out of sync");
        }

        self.buf.clear();
        msg.ser(&mut self.buf)?;

        // stays set if this future is dropped or the write fails
        self.is_broken = true;
        self.writer.write_all(&self.buf).await?;
        self.writer.flush().await?;
        self.is_broken = false;
        Ok(())
    }

    /// signals the end of the stream to the peer
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use bytes::BytesMut;
    use tokio::io::AsyncWriteExt;
    use tokio::time::timeout;

    use crate::vsockets::{vnic_registry, PromiscuousLevel, SocketOpen, StartDump};

    use super::*;

    fn reader<R: AsyncRead + Unpin>(r: R, read_chunk_size: usize) -> PacketReader<R> {
        let config = ChannelConfig {
            read_chunk_size,
            ..ChannelConfig::new()
        };
        PacketReader::new(r, Arc::new(vnic_registry().unwrap()), &config)
    }

    #[tokio::test]
    async fn test_send_receive() {
        let (a, b) = tokio::io::duplex(1024);
        let mut writer = PacketWriter::new(a);
        let mut reader = reader(b, 7);

        let messages: Vec<VnicControlMessage> = vec![
            SocketOpen::listen("1.1.1.1", 80, 8080).into(),
            StartDump.into(),
            PromiscuousLevel::assign(5).into(),
        ];
        for msg in &messages {
            writer.send(msg).await.unwrap();
        }
        writer.shutdown().await.unwrap();

        for msg in messages {
            assert_eq!(reader.next_message().await.unwrap(), Some(msg));
        }
        assert_eq!(reader.next_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_closed_mid_packet() {
        let mut buf = BytesMut::new();
        VnicControlMessage::from(StartDump).ser(&mut buf).unwrap();

        let (mut a, b) = tokio::io::duplex(1024);
        let mut reader = reader(b, 1024);
        a.write_all(&buf[..buf.len() - 1]).await.unwrap();
        drop(a);

        assert!(reader.next_message().await.is_err());
    }

    #[tokio::test]
    async fn test_garbage() {
        let (mut a, b) = tokio::io::duplex(1024);
        let mut reader = reader(b, 1024);
        a.write_all(b"\0\0\0\x02\xc3\x28").await.unwrap();

        assert!(reader.next_message().await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_send_breaks_writer() {
        let (a, _b) = tokio::io::duplex(8);
        let mut writer = PacketWriter::new(a);

        let msg: VnicControlMessage = PromiscuousLevel::assign(3).into();
        assert!(timeout(Duration::from_millis(50), writer.send(&msg)).await.is_err());
        assert!(writer.is_broken());
        assert!(writer.send(&StartDump.into()).await.is_err());
    }
}

use std::sync::Arc;

use anyhow::{anyhow, bail};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::channel::config::ChannelConfig;
use crate::channel::correlator::ResponseCorrelator;
use crate::channel::framed::{PacketReader, PacketWriter};
use crate::vsockets::{vnic_registry, ConnectionSpawned, PromiscuousLevel, SocketOpen, SocketOpenResponse, StartDump, VnicControlMessage};

/// The client side of a VNIC socket control channel.
///
/// Requests may be issued concurrently, they are sent in the order they acquire the channel's
///  write lock and their responses are matched in that order. 'Connection spawned'
///  notifications are delivered through the receiver returned by [ControlClient::new].
pub struct ControlClient<S> {
    writer: Mutex<PacketWriter<WriteHalf<S>>>,
    correlator: Arc<Mutex<ResponseCorrelator>>,
    receive_task: JoinHandle<()>,
}

impl <S> Drop for ControlClient<S> {
    fn drop(&mut self) {
        self.receive_task.abort();
    }
}

impl <S: AsyncRead + AsyncWrite + Send + 'static> ControlClient<S> {
    pub fn new(stream: S, config: &ChannelConfig) -> anyhow::Result<(ControlClient<S>, mpsc::Receiver<ConnectionSpawned>)> {
        let registry = Arc::new(vnic_registry()?);
        let (read_half, write_half) = tokio::io::split(stream);

        let (notification_sender, notification_receiver) = mpsc::channel(config.notification_buffer_size);
        let correlator = Arc::new(Mutex::new(ResponseCorrelator::new()));

        let reader = PacketReader::new(read_half, registry, config);
        let receive_task = tokio::spawn(receive_loop(reader, correlator.clone(), notification_sender));

        let client = ControlClient {
            writer: Mutex::new(PacketWriter::new(write_half)),
            correlator,
            receive_task,
        };
        Ok((client, notification_receiver))
    }

    pub async fn open_socket(&self, request: SocketOpen) -> anyhow::Result<SocketOpenResponse> {
        match self.request(request.into()).await? {
            VnicControlMessage::SocketOpenResponse(response) => Ok(response),
            other => bail!("unexpected response to socket open request: {:?}", other),
        }
    }

    pub async fn promiscuous_level(&self) -> anyhow::Result<u8> {
        self.promiscuous_level_request(PromiscuousLevel::query()).await
    }

    /// returns the level the server actually set
    pub async fn set_promiscuous_level(&self, level: u8) -> anyhow::Result<u8> {
        self.promiscuous_level_request(PromiscuousLevel::assign(level)).await
    }

    async fn promiscuous_level_request(&self, request: PromiscuousLevel) -> anyhow::Result<u8> {
        match self.request(request.into()).await? {
            VnicControlMessage::PromiscuousLevel(PromiscuousLevel { get: Some(level), .. }) => Ok(level),
            other => bail!("unexpected response to promiscuous level request: {:?}", other),
        }
    }

    /// There is no response to this request.
    pub async fn start_dump(&self) -> anyhow::Result<()> {
        self.usable_writer().await?
            .send(&StartDump.into()).await
    }

    /// Once a send was cancelled or failed, the server can not decode anything we send, and
    ///  responses can no longer be matched to requests. The channel is closed for good then.
    async fn usable_writer(&self) -> anyhow::Result<MutexGuard<'_, PacketWriter<WriteHalf<S>>>> {
        let writer = self.writer.lock().await;
        if writer.is_broken() {
            self.correlator.lock().await
                .close();
            bail!("control channel is unusable after an incomplete send");
        }
        Ok(writer)
    }

    async fn request(&self, msg: VnicControlMessage) -> anyhow::Result<VnicControlMessage> {
        let kind = msg.expected_response()
            .ok_or_else(|| anyhow!("not a request: {:?}", msg))?;

        let reply = {
            let mut writer = self.usable_writer().await?;
            let reply = self.correlator.lock().await
                .expect(kind)?;

            let mut send_guard = IncompleteSendGuard { correlator: &self.correlator, is_complete: false };
            let result = writer.send(&msg).await;
            if result.is_err() && writer.is_broken() {
                self.correlator.lock().await
                    .close();
            }
            send_guard.is_complete = true;
            result?;
            reply
        };

        reply.await
            .map_err(|_| anyhow!("control channel was closed before a response was received"))
    }

    /// Closes the sending side. Pending requests fail once the server closes its side.
    pub async fn close(self) -> anyhow::Result<()> {
        self.writer.lock().await
            .shutdown().await
    }
}

/// Closes the correlator if a request future is dropped while its packet is being written. If the
///  correlator is locked at that moment, the next request closes it when it finds the writer
///  broken.
struct IncompleteSendGuard<'a> {
    correlator: &'a Mutex<ResponseCorrelator>,
    is_complete: bool,
}

impl Drop for IncompleteSendGuard<'_> {
    fn drop(&mut self) {
        if self.is_complete {
            return;
        }
        match self.correlator.try_lock() {
            Ok(mut correlator) => correlator.close(),
            Err(_) => debug!("correlator is locked - it is closed by the next request"),
        }
    }
}

async fn receive_loop<S: AsyncRead>(reader: PacketReader<ReadHalf<S>>, correlator: Arc<Mutex<ResponseCorrelator>>, notifications: mpsc::Sender<ConnectionSpawned>) {
    match _receive_loop(reader, &correlator, notifications).await {
        Ok(()) => info!("control channel closed by server"),
        Err(e) => error!("control channel failed: {}", e),
    }
    correlator.lock().await
        .close();
}

async fn _receive_loop<S: AsyncRead>(mut reader: PacketReader<ReadHalf<S>>, correlator: &Mutex<ResponseCorrelator>, notifications: mpsc::Sender<ConnectionSpawned>) -> anyhow::Result<()> {
    while let Some(msg) = reader.next_message().await? {
        match msg {
            VnicControlMessage::ConnectionSpawned(spawned) => {
                if notifications.send(spawned).await.is_err() {
                    debug!("nobody is listening for spawned connections - discarding notification");
                }
            }
            response => {
                correlator.lock().await
                    .on_response(response)?;
            }
        }
    }
    Ok(())
}

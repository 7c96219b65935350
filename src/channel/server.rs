use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::channel::config::ChannelConfig;
use crate::channel::framed::{PacketReader, PacketWriter};
use crate::packet::PacketRegistry;
use crate::vsockets::{vnic_registry, ConnectionSpawned, PromiscuousLevel, SocketOpen, SocketOpenResponse, SocketState, VnicControlMessage};

/// error code for a socket open request that is neither 'connect' nor 'listen'
pub const ERROR_INVALID_REQUEST: u8 = 0xfe;
/// error code for a socket open request on a channel whose socket is already open or pending
pub const ERROR_ALREADY_OPEN: u8 = 0xff;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SocketOpenFailure {
    pub code: u8,
    pub message: String,
}

impl SocketOpenFailure {
    pub fn new(code: u8, message: impl Into<String>) -> SocketOpenFailure {
        SocketOpenFailure {
            code,
            message: message.into(),
        }
    }
}

/// The VNIC that actually owns the sockets. Connections accepted by a listening socket are
///  reported through the notification channel passed to [ControlServer::serve].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VnicDriver: Send + Sync + 'static {
    /// returns the local port of the new connection
    async fn connect(&self, destination: String, destination_port: u16) -> Result<u16, SocketOpenFailure>;
    /// returns the port the socket listens on
    async fn listen(&self, source_port: u16) -> Result<u16, SocketOpenFailure>;
    async fn start_dump(&self);
    /// returns the level that is in effect afterwards, which may differ from the requested level
    async fn set_promiscuous_level(&self, level: u8) -> u8;
    async fn promiscuous_level(&self) -> u8;
}

/// what the driver is asked to open
enum OpenTarget {
    Connect { destination: String, destination_port: u16 },
    Listen { source_port: u16 },
}

impl OpenTarget {
    /// `None` for a request with both or neither payload
    fn of(request: &SocketOpen) -> Option<OpenTarget> {
        match (&request.connect_data, &request.listen_data) {
            (Some(connect), None) => Some(OpenTarget::Connect {
                destination: connect.destination.clone(),
                destination_port: connect.destination_port,
            }),
            (None, Some(listen)) => Some(OpenTarget::Listen {
                source_port: listen.source_port,
            }),
            _ => None,
        }
    }
}

/// Serves control channels on behalf of a [VnicDriver]. Each channel controls a single socket.
pub struct ControlServer<D: VnicDriver> {
    driver: Arc<D>,
    registry: Arc<PacketRegistry>,
    config: ChannelConfig,
}

impl <D: VnicDriver> ControlServer<D> {
    pub fn new(driver: Arc<D>, config: ChannelConfig) -> anyhow::Result<ControlServer<D>> {
        Ok(ControlServer {
            driver,
            registry: Arc::new(vnic_registry()?),
            config,
        })
    }

    /// Handles requests on a single control channel until the client closes it.
    pub async fn serve<S: AsyncRead + AsyncWrite>(&self, stream: S, mut notifications: mpsc::Receiver<ConnectionSpawned>) -> anyhow::Result<()> {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = PacketReader::new(read_half, self.registry.clone(), &self.config);
        let mut writer = PacketWriter::new(write_half);

        let mut state = SocketState::default();
        let mut has_notifications = true;

        loop {
            select! {
                msg = reader.next_message() => {
                    let msg = match msg? {
                        Some(msg) => msg,
                        None => {
                            info!("control channel closed by client");
                            return Ok(());
                        }
                    };
                    if let Some(response) = self.on_request(&mut state, msg).await {
                        writer.send(&response).await?;
                    }
                }
                spawned = notifications.recv(), if has_notifications => {
                    match spawned {
                        Some(spawned) => {
                            match state.on_connection_spawned(&spawned) {
                                Ok(child) => {
                                    debug!("spawned {:?}", child);
                                    writer.send(&spawned.into()).await?;
                                }
                                Err(e) => warn!("discarding notification: {}", e),
                            }
                        }
                        None => {
                            debug!("driver closed the notification channel");
                            has_notifications = false;
                        }
                    }
                }
            }
        }
    }

    async fn on_request(&self, state: &mut SocketState, msg: VnicControlMessage) -> Option<VnicControlMessage> {
        match msg {
            VnicControlMessage::SocketOpen(request) => Some(self.on_socket_open(state, request).await.into()),
            VnicControlMessage::StartDump(_) => {
                self.on_start_dump(state).await;
                None
            }
            VnicControlMessage::PromiscuousLevel(request) => Some(self.on_promiscuous_level(request).await.into()),
            other => {
                warn!("ignoring unexpected message from client: {:?}", other);
                None
            }
        }
    }

    async fn on_socket_open(&self, state: &mut SocketState, request: SocketOpen) -> SocketOpenResponse {
        let target = match OpenTarget::of(&request) {
            Some(target) => target,
            None => {
                warn!("rejecting socket open request: {:?}", request);
                return SocketOpenResponse::failure(0, ERROR_INVALID_REQUEST, "request must contain either connect data or listen data");
            }
        };

        let pending = match state.on_open(&request) {
            Ok(pending) => pending,
            Err(e) => {
                warn!("rejecting socket open request: {}", e);
                return SocketOpenResponse::failure(0, ERROR_ALREADY_OPEN, "socket is already open");
            }
        };

        let result = match target {
            OpenTarget::Connect { destination, destination_port } => self.driver.connect(destination, destination_port).await,
            OpenTarget::Listen { source_port } => self.driver.listen(source_port).await,
        };
        let response = match result {
            Ok(port) => SocketOpenResponse::success(port),
            Err(failure) => SocketOpenResponse::failure(0, failure.code, failure.message),
        };

        *state = match pending.on_open_response(&response) {
            Ok(new_state) => new_state,
            Err(e) => {
                error!("{}", e);
                SocketState::Closed
            }
        };
        debug!("socket state is now {:?}", state);
        response
    }

    async fn on_start_dump(&self, state: &mut SocketState) {
        match state.on_start_dump() {
            Ok(new_state) => {
                *state = new_state;
                self.driver.start_dump().await;
            }
            Err(e) => warn!("ignoring start dump request: {}", e),
        }
    }

    async fn on_promiscuous_level(&self, request: PromiscuousLevel) -> PromiscuousLevel {
        if request.get.is_some() {
            debug!("ignoring 'get' in promiscuous level request {:?}", request);
        }

        let level = match request.set {
            Some(level) => self.driver.set_promiscuous_level(level).await,
            None => self.driver.promiscuous_level().await,
        };
        PromiscuousLevel::reply(level)
    }
}

#[cfg(test)]
mod test {
    use mockall::predicate::eq;
    use rstest::rstest;

    use crate::vsockets::{SocketMode, StartDump};

    use super::*;

    fn server(driver: MockVnicDriver) -> ControlServer<MockVnicDriver> {
        ControlServer::new(Arc::new(driver), ChannelConfig::new()).unwrap()
    }

    fn spawned() -> ConnectionSpawned {
        ConnectionSpawned {
            spawn_tcp_port: 555,
            source: "0.0.0.0".to_string(),
            source_port: 999,
            destination: "1.2.3.4".to_string(),
            destination_port: 123,
        }
    }

    #[tokio::test]
    async fn test_connect() {
        let mut driver = MockVnicDriver::new();
        driver.expect_connect()
            .with(eq("2.2.2.2".to_string()), eq(1000))
            .times(1)
            .returning(|_, _| Ok(4711));
        let server = server(driver);

        let mut state = SocketState::Closed;
        let response = server.on_request(&mut state, SocketOpen::connect("1.1.1.1", 80, "2.2.2.2", 1000).into()).await;
        assert_eq!(response, Some(SocketOpenResponse::success(4711).into()));
        assert_eq!(state, SocketState::Connected { port: 4711, dumping: false });
    }

    #[tokio::test]
    async fn test_listen_failure() {
        let mut driver = MockVnicDriver::new();
        driver.expect_listen()
            .with(eq(8080))
            .times(1)
            .returning(|_| Err(SocketOpenFailure::new(3, "in use")));
        let server = server(driver);

        let mut state = SocketState::Closed;
        let response = server.on_request(&mut state, SocketOpen::listen("1.1.1.1", 80, 8080).into()).await;
        assert_eq!(response, Some(SocketOpenResponse::failure(0, 3, "in use").into()));
        assert_eq!(state, SocketState::Closed);
    }

    fn ambiguous() -> SocketOpen {
        SocketOpen {
            listen_data: SocketOpen::listen("1.1.1.1", 80, 8080).listen_data,
            ..SocketOpen::connect("1.1.1.1", 80, "2.2.2.2", 1000)
        }
    }

    fn empty() -> SocketOpen {
        SocketOpen {
            callback_address: "1.1.1.1".to_string(),
            callback_port: 80,
            connect_data: None,
            listen_data: None,
        }
    }

    #[rstest]
    #[case::both(SocketState::Closed, ambiguous(), ERROR_INVALID_REQUEST)]
    #[case::neither(SocketState::Closed, empty(), ERROR_INVALID_REQUEST)]
    #[case::both_while_open(SocketState::Connected { port: 1, dumping: false }, ambiguous(), ERROR_INVALID_REQUEST)]
    #[case::pending(SocketState::OpenPending(SocketMode::Connect), SocketOpen::listen("1.1.1.1", 80, 8080), ERROR_ALREADY_OPEN)]
    #[case::connected(SocketState::Connected { port: 1, dumping: false }, SocketOpen::listen("1.1.1.1", 80, 8080), ERROR_ALREADY_OPEN)]
    #[case::listening(SocketState::Listening { port: 1, dumping: true }, SocketOpen::connect("1.1.1.1", 80, "2.2.2.2", 1000), ERROR_ALREADY_OPEN)]
    #[tokio::test]
    async fn test_socket_open_rejected(#[case] initial: SocketState, #[case] request: SocketOpen, #[case] error_code: u8) {
        let server = server(MockVnicDriver::new());

        let mut state = initial;
        let response = server.on_socket_open(&mut state, request).await;
        assert!(response.is_failure());
        assert_eq!(response.error_code, Some(error_code));
        assert_eq!(response.port, 0);
        assert_eq!(state, initial);
    }

    #[rstest]
    #[case::closed(SocketState::Closed, SocketState::Closed, false)]
    #[case::pending(SocketState::OpenPending(SocketMode::Listen), SocketState::OpenPending(SocketMode::Listen), false)]
    #[case::connected(SocketState::Connected { port: 1, dumping: false }, SocketState::Connected { port: 1, dumping: true }, true)]
    #[case::listening(SocketState::Listening { port: 1, dumping: false }, SocketState::Listening { port: 1, dumping: true }, true)]
    #[tokio::test]
    async fn test_start_dump(#[case] initial: SocketState, #[case] expected: SocketState, #[case] forwarded: bool) {
        let mut driver = MockVnicDriver::new();
        driver.expect_start_dump()
            .times(if forwarded { 1 } else { 0 })
            .returning(|| ());
        let server = server(driver);

        let mut state = initial;
        assert_eq!(server.on_request(&mut state, StartDump.into()).await, None);
        assert_eq!(state, expected);
    }

    #[rstest]
    #[case::query(PromiscuousLevel::query(), 2)]
    #[case::query_with_get(PromiscuousLevel::reply(9), 2)]
    #[case::assign(PromiscuousLevel::assign(5), 4)]
    #[tokio::test]
    async fn test_promiscuous_level(#[case] request: PromiscuousLevel, #[case] expected: u8) {
        let mut driver = MockVnicDriver::new();
        driver.expect_promiscuous_level()
            .returning(|| 2);
        driver.expect_set_promiscuous_level()
            .with(eq(5))
            .returning(|_| 4);
        let server = server(driver);

        let mut state = SocketState::Closed;
        let response = server.on_request(&mut state, request.into()).await;
        assert_eq!(response, Some(PromiscuousLevel::reply(expected).into()));
    }

    #[rstest]
    #[case::socket_open_response(SocketOpenResponse::success(1).into())]
    #[case::connection_spawned(spawned().into())]
    #[tokio::test]
    async fn test_server_to_client_messages_are_ignored(#[case] msg: VnicControlMessage) {
        let server = server(MockVnicDriver::new());

        let mut state = SocketState::Listening { port: 1, dumping: false };
        assert_eq!(server.on_request(&mut state, msg).await, None);
        assert_eq!(state, SocketState::Listening { port: 1, dumping: false });
    }

    #[tokio::test]
    async fn test_serve() {
        let mut driver = MockVnicDriver::new();
        driver.expect_listen()
            .with(eq(8080))
            .times(1)
            .returning(Ok);
        let server = server(driver);

        let (client_stream, server_stream) = tokio::io::duplex(4096);
        let (notification_sender, notification_receiver) = mpsc::channel(4);

        let client = async move {
            let (r, w) = tokio::io::split(client_stream);
            let mut reader = PacketReader::new(r, Arc::new(vnic_registry().unwrap()), &ChannelConfig::new());
            let mut writer = PacketWriter::new(w);

            writer.send(&SocketOpen::listen("1.1.1.1", 80, 8080).into()).await.unwrap();
            assert_eq!(reader.next_message().await.unwrap(), Some(SocketOpenResponse::success(8080).into()));

            notification_sender.send(spawned()).await.unwrap();
            assert_eq!(reader.next_message().await.unwrap(), Some(spawned().into()));
        };

        let (served, _) = tokio::join!(server.serve(server_stream, notification_receiver), client);
        served.unwrap();
    }
}

use anyhow::{anyhow, bail};

use crate::vsockets::{ConnectionSpawned, SocketMode, SocketOpen, SocketOpenResponse};

/// The lifecycle of a single VNIC socket as driven by the control messages:
///
/// ```ascii
/// Closed --SocketOpen--> OpenPending --SocketOpenResponse(success)--> Connected / Listening
///                        OpenPending --SocketOpenResponse(failure)--> Closed
/// Connected / Listening --StartDump--> same state with dumping on
/// Listening --ConnectionSpawned--> Listening (plus a new Connected child socket)
/// ```
///
/// There is no 'close' message in the protocol, closing is up to the transport.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum SocketState {
    #[default]
    Closed,
    OpenPending(SocketMode),
    Connected { port: u16, dumping: bool },
    Listening { port: u16, dumping: bool },
}

impl SocketState {
    pub fn on_open(self, request: &SocketOpen) -> anyhow::Result<SocketState> {
        let mode = request.mode()
            .ok_or_else(|| anyhow!("socket open request is neither 'connect' nor 'listen': {:?}", request))?;

        match self {
            SocketState::Closed => Ok(SocketState::OpenPending(mode)),
            other => bail!("can not open a socket in state {:?}", other),
        }
    }

    pub fn on_open_response(self, response: &SocketOpenResponse) -> anyhow::Result<SocketState> {
        match self {
            SocketState::OpenPending(_) if response.is_failure() => Ok(SocketState::Closed),
            SocketState::OpenPending(SocketMode::Connect) => Ok(SocketState::Connected { port: response.port, dumping: false }),
            SocketState::OpenPending(SocketMode::Listen) => Ok(SocketState::Listening { port: response.port, dumping: false }),
            other => bail!("unexpected socket open response in state {:?}", other),
        }
    }

    /// Returns the state of the spawned child connection, the listening socket itself is not
    ///  affected.
    pub fn on_connection_spawned(&self, spawned: &ConnectionSpawned) -> anyhow::Result<SocketState> {
        match self {
            SocketState::Listening { .. } => Ok(SocketState::Connected { port: spawned.spawn_tcp_port, dumping: false }),
            other => bail!("connection spawned for a socket that is not listening: {:?}", other),
        }
    }

    pub fn on_start_dump(self) -> anyhow::Result<SocketState> {
        match self {
            SocketState::Connected { port, .. } => Ok(SocketState::Connected { port, dumping: true }),
            SocketState::Listening { port, .. } => Ok(SocketState::Listening { port, dumping: true }),
            other => bail!("can not start a dump for a socket in state {:?}", other),
        }
    }

    pub fn close(self) -> SocketState {
        SocketState::Closed
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SocketState::Connected { .. } | SocketState::Listening { .. })
    }
}

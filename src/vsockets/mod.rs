//! The VNIC socket control message set.

mod connection_spawned;
mod control_message;
mod promiscuous_level;
mod socket_open;
mod socket_open_response;
mod socket_state;
mod start_dump;

pub use connection_spawned::ConnectionSpawned;
pub use control_message::{vnic_registry, ResponseKind, VnicControlMessage};
pub use promiscuous_level::PromiscuousLevel;
pub use socket_open::{SocketConnectData, SocketListenData, SocketMode, SocketOpen};
pub use socket_open_response::SocketOpenResponse;
pub use socket_state::SocketState;
pub use start_dump::StartDump;

/// all VNIC control packet types are currently at this version
pub const VSOCKETS_VERSION: &str = "1.0";

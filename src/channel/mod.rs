//! Async control channels over any byte stream: framing, request / response correlation and the
//!  client and server ends.

pub mod client;
pub mod config;
pub mod correlator;
pub mod framed;
pub mod server;

pub use client::ControlClient;
pub use config::ChannelConfig;
pub use correlator::ResponseCorrelator;
pub use framed::{PacketReader, PacketWriter};
pub use server::{ControlServer, SocketOpenFailure, VnicDriver, ERROR_ALREADY_OPEN, ERROR_INVALID_REQUEST};

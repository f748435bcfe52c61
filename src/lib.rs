//! Realtime chat client for the CollabForge marketplace backend.
//!
//! A [`RealtimeClient`] owns one Socket.IO session: it authenticates with a
//! bearer token, keeps presence and typing state current, reconnects with
//! linear backoff and reports everything through [`ClientEvent`]s. The
//! [`format`] and [`validation`] modules hold the pure helpers used to
//! display and guard chat input.

pub mod api;
pub mod common;
pub mod config;
pub mod error;
pub mod format;
pub mod network;
pub mod state;
pub mod timer;
pub mod validation;

pub use common::{
    ClientCommand, ClientEvent, ConnectionStatus, Message, MessageSender, MessageType,
    OnlineUser, ReadReceipt,
};
pub use config::{AppConfig, ClientConfig};
pub use error::{ClientError, ProtocolError, TransportError, ValidationError};
pub use network::{Connector, RealtimeClient, RealtimeHandle, Transport, WsConnector};

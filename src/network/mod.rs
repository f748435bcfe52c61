pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{RealtimeClient, RealtimeHandle};
pub use transport::{Connector, Transport, WsConnector, WsTransport};

use thiserror::Error;

/// Failures of the underlying frame transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("transport closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// Frames that could not be decoded into a known packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type `{0}`")]
    UnknownEnginePacket(char),
    #[error("unknown socket.io packet type `{0}`")]
    UnknownSocketPacket(char),
    #[error("unsupported socket.io packet type `{0}`")]
    Unsupported(char),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("payload for `{event}` did not match: {reason}")]
    BadPayload { event: String, reason: String },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}

/// Errors raised while establishing or running a realtime session.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no auth token configured")]
    MissingToken,
    #[error("invalid server url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("server rejected connection: {0}")]
    Rejected(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

/// Rejections from the synchronous input guards.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message is {len} characters, the limit is {max}")]
    MessageTooLong { len: usize, max: usize },
    #[error("file is {size}, the limit is {max}")]
    FileTooLarge { size: String, max: String },
    #[error("file type `{0}` is not allowed")]
    UnsupportedFileType(String),
}

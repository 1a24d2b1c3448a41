//! Error types for boatlink.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for boatlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for boatlink.
#[derive(Error, Debug)]
pub enum Error {
    // Link lifecycle errors
    #[error("link not started")]
    LinkNotStarted,

    #[error("link already started")]
    LinkAlreadyStarted,

    // Transport errors
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    // Protocol errors
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // Mission errors
    #[error("a mission is already running")]
    MissionAlreadyRunning,

    #[error("mission cancelled")]
    MissionCancelled,

    #[error("mission failed: {0}")]
    MissionFailed(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bind failed on {addr}: {reason}")]
    BindFailed { addr: SocketAddr, reason: String },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("socket error: {0}")]
    SocketError(String),
}

/// Wire protocol errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed packet: header 0x{header:02x}, expected {expected} bytes, got {got}")]
    MalformedPacket {
        header: u8,
        expected: usize,
        got: usize,
    },

    #[error("empty datagram")]
    EmptyDatagram,

    #[error("invalid header: 0x{0:02x}")]
    InvalidHeader(u8),

    #[error("invalid {field} value: {value}")]
    InvalidField { field: &'static str, value: u8 },
}

impl Error {
    /// Check if the error is a cooperative mission cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::MissionCancelled)
    }

    /// Check if error is a transient transport failure the heartbeat will paper over.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Transport(
                TransportError::SendFailed(_) | TransportError::ReceiveFailed(_)
            ) | Error::Io(_)
        )
    }
}

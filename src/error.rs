//! The error taxonomy shared by every layer of the gateway (§7).
//!
//! Each variant is a closed, structured alternative rather than an opaque
//! string so that callers further up the stack (the controller, the gateway)
//! can match on `kind()` without re-parsing a message.

use std::fmt;

/// One of the ten error kinds named in the specification's §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Descriptor,
    UnsupportedDeviceKind,
    PeerClosed,
    PeerReset,
    Timeout,
    SinkWrite,
    Cancelled,
    SubscriberProtocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Descriptor => "descriptor",
            ErrorKind::UnsupportedDeviceKind => "unsupported-device-kind",
            ErrorKind::PeerClosed => "peer-closed",
            ErrorKind::PeerReset => "peer-reset",
            ErrorKind::Timeout => "timeout",
            ErrorKind::SinkWrite => "sink-write",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::SubscriberProtocol => "subscriber-protocol",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Descriptor(String),

    #[error("cannot build path for unknown device type: {0}")]
    UnsupportedDeviceKind(String),

    #[error("connection closed gracefully by peer")]
    PeerClosed,

    #[error("connection reset by peer")]
    PeerReset,

    #[error("read timeout, connection might be closed")]
    Timeout,

    #[error("sink refused bytes: {0}")]
    SinkWrite(String),

    #[error("cancelled")]
    Cancelled,

    #[error("malformed subscriber command: {0}")]
    SubscriberProtocol(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Transport(_) => ErrorKind::Transport,
            GatewayError::Protocol(_) => ErrorKind::Protocol,
            GatewayError::Descriptor(_) => ErrorKind::Descriptor,
            GatewayError::UnsupportedDeviceKind(_) => ErrorKind::UnsupportedDeviceKind,
            GatewayError::PeerClosed => ErrorKind::PeerClosed,
            GatewayError::PeerReset => ErrorKind::PeerReset,
            GatewayError::Timeout => ErrorKind::Timeout,
            GatewayError::SinkWrite(_) => ErrorKind::SinkWrite,
            GatewayError::Cancelled => ErrorKind::Cancelled,
            GatewayError::SubscriberProtocol(_) => ErrorKind::SubscriberProtocol,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(e: url::ParseError) -> Self {
        GatewayError::Descriptor(e.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;
        match e.kind() {
            IoKind::TimedOut => GatewayError::Timeout,
            IoKind::ConnectionReset => GatewayError::PeerReset,
            IoKind::UnexpectedEof => GatewayError::PeerClosed,
            _ => GatewayError::Transport(e.to_string()),
        }
    }
}

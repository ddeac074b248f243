//! Errors raised by [`FeatureTransport`](super::FeatureTransport) implementations.

use core::fmt;
use std::io;

/// Failure reported by the device link itself.
///
/// The engine never inspects these beyond [`TransportError::Timeout`]; everything
/// else is wrapped into the matching `Transport*Failed` engine error.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// The device went away (unplugged, link dropped).
    Disconnected,
    /// No report arrived within the requested timeout.
    Timeout,
    /// The handle is not open.
    NotOpen,
    /// Backend-specific failure without a richer type.
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Disconnected => write!(f, "device disconnected"),
            Self::Timeout => write!(f, "timed out"),
            Self::NotOpen => write!(f, "device handle not open"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe => Self::Disconnected,
            _ => Self::Io(err),
        }
    }
}

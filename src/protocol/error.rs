//! PTP error types

use thiserror::Error;

use crate::transport::TransportError;

/// PTP engine errors
///
/// Every session operation fails with exactly one of these. Transport failures
/// keep the underlying [`TransportError`] as their source.
#[derive(Error, Debug)]
pub enum Error {
    /// Operation invoked without a transport handle
    #[error("no device specified")]
    NoDeviceSpecified,

    /// Session was closed or never attached to a device
    #[error("no connected device")]
    NoConnectedDevice,

    /// Transport exists but is not open
    #[error("device not opened")]
    DeviceNotOpened,

    /// Outgoing command text is empty
    #[error("no data to send")]
    EmptyCommand,

    /// Outgoing command does not fit the declared length field or configured bound
    #[error("message too long: {len} bytes (max {max})")]
    MessageTooLong {
        /// Encoded command length
        len: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Payload chunk does not fit in one frame
    #[error("chunk too large: {len} bytes (max {max})")]
    ChunkTooLarge {
        /// Chunk length
        len: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Opening the transport failed
    #[error("failed to open device: {0}")]
    TransportOpenFailed(#[source] TransportError),

    /// Closing the transport failed
    #[error("failed to close device: {0}")]
    TransportCloseFailed(#[source] TransportError),

    /// Writing a frame failed
    #[error("failed to write frame: {0}")]
    TransportWriteFailed(#[source] TransportError),

    /// Reading a frame failed
    #[error("failed to read frame: {0}")]
    TransportReadFailed(#[source] TransportError),

    /// Session was closed while an exchange was in flight
    #[error("transport closed")]
    TransportClosed,

    /// No frame arrived before the read or exchange deadline
    #[error("timed out waiting for device response after {elapsed_ms} ms")]
    ReadTimeout {
        /// Time spent in the receive loop
        elapsed_ms: u64,
    },

    /// Device answered `EMPTY`
    #[error("empty response")]
    EmptyResponse,

    /// Device answered `NACK`; carries the device's own message
    #[error("{0}")]
    DeviceReportedError(String),

    /// Frame carried a type byte outside the protocol
    #[error("unknown message type: {type_byte}")]
    UnknownMessageType {
        /// Offending byte
        type_byte: u8,
    },

    /// Reassembled response exceeded the configured bound
    #[error("response too long: more than {max} bytes")]
    ResponseTooLong {
        /// Maximum allowed
        max: usize,
    },

    /// Reassembled response was not valid JSON
    #[error("malformed response: {source}")]
    MalformedResponse {
        /// Parser failure
        #[source]
        source: serde_json::Error,
    },
}

/// Payload-free classification of [`Error`], stable across releases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::NoDeviceSpecified`]
    NoDeviceSpecified,
    /// See [`Error::NoConnectedDevice`]
    NoConnectedDevice,
    /// See [`Error::DeviceNotOpened`]
    DeviceNotOpened,
    /// See [`Error::EmptyCommand`]
    EmptyCommand,
    /// See [`Error::MessageTooLong`] and [`Error::ChunkTooLarge`]
    MessageTooLong,
    /// See [`Error::TransportOpenFailed`]
    TransportOpenFailed,
    /// See [`Error::TransportCloseFailed`]
    TransportCloseFailed,
    /// See [`Error::TransportWriteFailed`]
    TransportWriteFailed,
    /// See [`Error::TransportReadFailed`]
    TransportReadFailed,
    /// See [`Error::TransportClosed`]
    TransportClosed,
    /// See [`Error::ReadTimeout`]
    ReadTimeout,
    /// See [`Error::EmptyResponse`]
    EmptyResponse,
    /// See [`Error::DeviceReportedError`]
    DeviceReportedError,
    /// See [`Error::UnknownMessageType`]
    UnknownMessageType,
    /// See [`Error::ResponseTooLong`]
    ResponseTooLong,
    /// See [`Error::MalformedResponse`]
    MalformedResponse,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoDeviceSpecified => ErrorKind::NoDeviceSpecified,
            Self::NoConnectedDevice => ErrorKind::NoConnectedDevice,
            Self::DeviceNotOpened => ErrorKind::DeviceNotOpened,
            Self::EmptyCommand => ErrorKind::EmptyCommand,
            Self::MessageTooLong { .. } | Self::ChunkTooLarge { .. } => ErrorKind::MessageTooLong,
            Self::TransportOpenFailed(_) => ErrorKind::TransportOpenFailed,
            Self::TransportCloseFailed(_) => ErrorKind::TransportCloseFailed,
            Self::TransportWriteFailed(_) => ErrorKind::TransportWriteFailed,
            Self::TransportReadFailed(_) => ErrorKind::TransportReadFailed,
            Self::TransportClosed => ErrorKind::TransportClosed,
            Self::ReadTimeout { .. } => ErrorKind::ReadTimeout,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::DeviceReportedError(_) => ErrorKind::DeviceReportedError,
            Self::UnknownMessageType { .. } => ErrorKind::UnknownMessageType,
            Self::ResponseTooLong { .. } => ErrorKind::ResponseTooLong,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Whether the failure came from the device rather than the link
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse
                | Self::DeviceReportedError(_)
                | Self::UnknownMessageType { .. }
                | Self::MalformedResponse { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nack_message_verbatim() {
        let err = Error::DeviceReportedError("bad path".into());
        assert_eq!(err.to_string(), "bad path");
        assert!(err.is_device_error());
    }

    #[test]
    fn test_unknown_type_mentions_byte() {
        let err = Error::UnknownMessageType { type_byte: 9 };
        assert!(err.to_string().contains('9'));
        assert_eq!(err.kind(), ErrorKind::UnknownMessageType);
    }

    #[test]
    fn test_transport_source_kept() {
        use std::error::Error as _;

        let err = Error::TransportWriteFailed(TransportError::Disconnected);
        assert!(err.source().is_some());
        assert!(!err.is_device_error());
    }
}

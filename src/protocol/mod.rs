//! PTP protocol core implementation
//!
//! This module provides the wire format, message types, and frame codec for PTP.
//! Nothing in here performs I/O.

mod codec;
mod command;
mod error;
mod header;
pub(crate) mod metrics;
mod types;

pub use codec::{IncomingFrame, OutgoingFrame, chunk_message, decode_frame, encode_frame};
pub use command::{Command, TriggerTarget};
pub use error::{Error, ErrorKind, Result};
pub use header::{IncomingHeader, OutgoingHeader, decode_incoming_header, encode_outgoing_header};
pub use metrics::MetricsSnapshot;
pub use types::MessageType;

/// Feature report id used for both directions
pub const REPORT_ID: u8 = 6;

/// Size of one outgoing feature report in bytes
pub const FRAME_SIZE: usize = 244;

/// Outgoing header size: marker (2) + type (1) + declared length (2)
pub const OUTGOING_HEADER_SIZE: usize = 5;

/// Incoming header size: report id (1) + marker (2) + type (1) + declared length (2)
pub const INCOMING_HEADER_SIZE: usize = 6;

/// Maximum payload bytes carried by one outgoing frame
pub const MAX_CHUNK_SIZE: usize = FRAME_SIZE - OUTGOING_HEADER_SIZE;

/// Maximum payload bytes carried by one incoming frame
pub const MAX_INCOMING_CHUNK_SIZE: usize = FRAME_SIZE - INCOMING_HEADER_SIZE;

/// Largest logical message the 16-bit declared length field can describe
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

/// Two-byte marker that opens every frame after the report id
pub const FRAME_MARKER: [u8; 2] = [0x00, 0xFF];

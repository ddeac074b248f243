//! PTP frame headers
//!
//! Outgoing and incoming headers are not symmetric: the transport hands incoming
//! frames back with the report id still in front, so every incoming field sits one
//! byte further along.

use super::{FRAME_MARKER, MessageType, OUTGOING_HEADER_SIZE};

/// Header of a frame written to the device (5 bytes)
///
/// # Wire Format
///
/// ```text
/// +--------+--------+----------+-----------------------+
/// |  0x00  |  0xFF  | msg type | declared length (LE)  |
/// +--------+--------+----------+-----------------------+
///     0        1         2            3 .. 4
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingHeader {
    msg_type: MessageType,
    declared_len: u16,
}

impl OutgoingHeader {
    /// Create a new outgoing header
    #[must_use]
    pub const fn new(msg_type: MessageType, declared_len: u16) -> Self {
        Self {
            msg_type,
            declared_len,
        }
    }

    /// Get message type
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.msg_type
    }

    /// Get declared length
    #[must_use]
    pub const fn declared_len(&self) -> u16 {
        self.declared_len
    }

    /// Convert to bytes (little-endian length)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; OUTGOING_HEADER_SIZE] {
        let mut bytes = [0u8; OUTGOING_HEADER_SIZE];

        bytes[0..2].copy_from_slice(&FRAME_MARKER);
        bytes[2] = self.msg_type.as_u8();
        bytes[3..5].copy_from_slice(&self.declared_len.to_le_bytes());

        bytes
    }
}

/// Header of a frame read from the device (6 bytes)
///
/// # Wire Format
///
/// ```text
/// +-----------+--------+--------+----------+-----------------------+
/// | report id |  0x00  |  0xFF  | msg type | declared length (LE)  |
/// +-----------+--------+--------+----------+-----------------------+
///      0          1        2         3            4 .. 5
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingHeader {
    report_id: u8,
    marker: [u8; 2],
    type_byte: u8,
    declared_len: u16,
}

impl IncomingHeader {
    /// Parse from the front of a frame.
    ///
    /// Never fails: bytes missing from a short frame read as zero.
    #[must_use]
    pub fn parse(frame: &[u8]) -> Self {
        let byte = |idx: usize| frame.get(idx).copied().unwrap_or(0);

        Self {
            report_id: byte(0),
            marker: [byte(1), byte(2)],
            type_byte: byte(3),
            declared_len: u16::from_le_bytes([byte(4), byte(5)]),
        }
    }

    /// Report id echoed by the transport
    #[must_use]
    pub const fn report_id(&self) -> u8 {
        self.report_id
    }

    /// Raw message type byte
    #[must_use]
    pub const fn type_byte(&self) -> u8 {
        self.type_byte
    }

    /// Get message type, `None` when the byte is unknown
    #[must_use]
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u8(self.type_byte)
    }

    /// Get declared length
    #[must_use]
    pub const fn declared_len(&self) -> u16 {
        self.declared_len
    }

    /// Whether bytes 1..3 carry the `00 FF` marker
    #[must_use]
    pub fn has_marker(&self) -> bool {
        self.marker == FRAME_MARKER
    }
}

/// Lay out the 5-byte header of an outgoing frame.
#[must_use]
pub fn encode_outgoing_header(msg_type: MessageType, declared_len: u16) -> [u8; OUTGOING_HEADER_SIZE] {
    OutgoingHeader::new(msg_type, declared_len).to_bytes()
}

/// Read the 6-byte header of an incoming frame.
#[must_use]
pub fn decode_incoming_header(frame: &[u8]) -> IncomingHeader {
    IncomingHeader::parse(frame)
}

//! PTP message types

use std::fmt;

/// PTP message types
///
/// Any byte outside `0..=6` is not a message type; callers see `None` from
/// [`MessageType::from_u8`] and treat the frame as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// First chunk of a logical message
    First = 0,
    /// Continuation chunk
    Mid = 1,
    /// Acknowledged, no response payload
    AckNoResponse = 2,
    /// Acknowledged, response follows on the next read
    AckResponse = 3,
    /// Rejected, payload carries the device's error text
    Nack = 4,
    /// Device had nothing to return
    Empty = 5,
    /// Complete single-frame result
    Result = 6,
}

impl MessageType {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::First),
            1 => Some(Self::Mid),
            2 => Some(Self::AckNoResponse),
            3 => Some(Self::AckResponse),
            4 => Some(Self::Nack),
            5 => Some(Self::Empty),
            6 => Some(Self::Result),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this type belongs to a chunked `FIRST`/`MID` sequence
    #[must_use]
    pub const fn is_chunk(self) -> bool {
        matches!(self, Self::First | Self::Mid)
    }

    /// Check if receiving this type always ends the exchange
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AckNoResponse | Self::Nack | Self::Empty | Self::Result
        )
    }

    /// Check if this type signals a failed exchange
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Nack | Self::Empty)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::First => "FIRST",
            Self::Mid => "MID",
            Self::AckNoResponse => "ACK_NRSP",
            Self::AckResponse => "ACK_RSP",
            Self::Nack => "NACK",
            Self::Empty => "EMPTY",
            Self::Result => "RESULT",
        };
        write!(f, "{name}")
    }
}

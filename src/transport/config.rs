//! Session configuration.

use std::time::Duration;

use crate::protocol::{MAX_MESSAGE_LEN, REPORT_ID};

/// Session configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Feature report id for both directions.
    pub report_id: u8,
    /// Longest a single transport read may block.
    pub read_timeout: Duration,
    /// Longest one receive loop may run, across all of its reads.
    pub exchange_timeout: Duration,
    /// Largest outgoing command in bytes; values above 65535 are clamped.
    pub max_message_len: usize,
    /// Largest reassembled response in bytes.
    pub max_response_len: usize,
    /// Periodic heartbeat; `None` leaves the session silent between commands.
    pub keep_alive: Option<KeepAliveConfig>,
}

impl SessionConfig {
    /// Outgoing bound after clamping to what the length field can express.
    #[must_use]
    pub fn effective_max_message_len(&self) -> usize {
        self.max_message_len.min(MAX_MESSAGE_LEN)
    }

    /// Enable heartbeats.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            report_id: REPORT_ID,
            read_timeout: Duration::from_secs(2),
            exchange_timeout: Duration::from_secs(10),
            max_message_len: MAX_MESSAGE_LEN,
            max_response_len: MAX_MESSAGE_LEN,
            keep_alive: None,
        }
    }
}

/// Heartbeat schedule.
///
/// Each beat fires `interval` plus a random delay in `0..=jitter` after the last
/// successful exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KeepAliveConfig {
    /// Base delay.
    pub interval: Duration,
    /// Upper bound of the random extra delay.
    pub jitter: Duration,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            jitter: Duration::from_secs(1),
        }
    }
}

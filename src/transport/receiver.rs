//! Incoming half of an exchange: read frames until the device's answer is complete.
//!
//! The loop keeps a `remaining` counter, starting at 1. Each frame sets it anew:
//!
//! | type       | effect                                   | remaining          |
//! |------------|------------------------------------------|--------------------|
//! | `FIRST`    | append payload                           | declared - chunk   |
//! | `MID`      | append payload                           | declared - chunk   |
//! | `ACK_NRSP` | nothing                                  | 0                  |
//! | `ACK_RSP`  | nothing, the answer is on the next read  | 1                  |
//! | `NACK`     | record the device's message as the error | 0                  |
//! | `EMPTY`    | record "empty response"                  | 0                  |
//! | `RESULT`   | replace the payload with this frame's    | 0                  |
//! | unknown    | record "unknown message type"            | 0                  |

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::protocol::metrics::Metrics;
use crate::protocol::{Error, IncomingFrame, MAX_MESSAGE_LEN, MessageType, REPORT_ID, Result, decode_frame};

use super::{FeatureTransport, TransportError};

/// Bounds applied to one receive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveLimits {
    /// Longest a single read may block. A read that hits it ends the loop with
    /// [`Error::ReadTimeout`], even if `exchange_timeout` has time left.
    pub read_timeout: Duration,
    /// Longest the whole loop may run.
    pub exchange_timeout: Duration,
    /// Largest reassembled payload.
    pub max_response_len: usize,
}

impl Default for ReceiveLimits {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(2),
            exchange_timeout: Duration::from_secs(10),
            max_response_len: MAX_MESSAGE_LEN,
        }
    }
}

/// Accumulated outcome of one receive loop.
#[derive(Debug, Default)]
pub struct ExchangeResult {
    payload: BytesMut,
    error: Option<Error>,
    frames: usize,
}

impl ExchangeResult {
    /// Reassembled payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Error recorded from the device, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Number of frames consumed.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Fold one frame into the result and return the new `remaining` count.
    ///
    /// # Errors
    ///
    /// [`Error::ResponseTooLong`] if appending would exceed `max_len`.
    pub fn absorb(&mut self, frame: &IncomingFrame, max_len: usize) -> Result<usize> {
        self.frames += 1;

        let Some(msg_type) = frame.message_type() else {
            let type_byte = frame.header().type_byte();
            self.error = Some(Error::UnknownMessageType { type_byte });
            return Ok(0);
        };

        let remaining = match msg_type {
            MessageType::First | MessageType::Mid => {
                let chunk = frame.payload();
                if self.payload.len() + chunk.len() > max_len {
                    return Err(Error::ResponseTooLong { max: max_len });
                }
                self.payload.extend_from_slice(chunk);
                usize::from(frame.declared_len()).saturating_sub(chunk.len())
            }
            MessageType::AckNoResponse => 0,
            MessageType::AckResponse => 1,
            MessageType::Nack => {
                self.error = Some(Error::DeviceReportedError(frame.payload_text()));
                0
            }
            MessageType::Empty => {
                self.error = Some(Error::EmptyResponse);
                0
            }
            MessageType::Result => {
                self.payload.clear();
                self.payload.extend_from_slice(frame.payload());
                0
            }
        };

        Ok(remaining)
    }

    /// Turn the result into the caller-facing value.
    ///
    /// A recorded error wins over any payload. An empty payload is `null`.
    ///
    /// # Errors
    ///
    /// The recorded device error, or [`Error::MalformedResponse`] if the payload
    /// is not JSON.
    pub fn into_value(self) -> Result<Value> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.payload.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.payload).map_err(|source| Error::MalformedResponse { source })
    }
}

/// Reads one response from the device.
pub struct Receiver<'a, T: FeatureTransport + ?Sized> {
    transport: &'a T,
    report_id: u8,
    limits: ReceiveLimits,
    cancel: Option<&'a AtomicBool>,
    metrics: Option<&'a Metrics>,
}

impl<'a, T: FeatureTransport + ?Sized> Receiver<'a, T> {
    /// Create a receiver using the default report id and limits.
    #[must_use]
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            report_id: REPORT_ID,
            limits: ReceiveLimits::default(),
            cancel: None,
            metrics: None,
        }
    }

    /// Override the report id.
    #[must_use]
    pub fn report_id(mut self, report_id: u8) -> Self {
        self.report_id = report_id;
        self
    }

    /// Override the loop bounds.
    #[must_use]
    pub fn limits(mut self, limits: ReceiveLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fail with [`Error::TransportClosed`] before the next read once `flag` is set.
    #[must_use]
    pub fn cancel_on(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub(crate) fn metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Run the receive loop to completion.
    ///
    /// # Errors
    ///
    /// Link failures only ([`Error::TransportReadFailed`], [`Error::ReadTimeout`],
    /// [`Error::TransportClosed`], [`Error::ResponseTooLong`]). Errors the device
    /// reports are carried inside the returned [`ExchangeResult`].
    #[instrument(level = "trace", skip(self))]
    pub fn receive(&self) -> Result<ExchangeResult> {
        let started = Instant::now();
        let deadline = started + self.limits.exchange_timeout;
        let timed_out = || Error::ReadTimeout {
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        let mut result = ExchangeResult::default();
        let mut remaining = 1usize;

        while remaining > 0 {
            if self.cancelled() {
                return Err(Error::TransportClosed);
            }

            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(timed_out());
            }

            let raw = match self
                .transport
                .read_feature_report(self.report_id, left.min(self.limits.read_timeout))
            {
                Ok(raw) => raw,
                Err(_) if self.cancelled() => return Err(Error::TransportClosed),
                Err(TransportError::Timeout) => return Err(timed_out()),
                Err(err) => return Err(Error::TransportReadFailed(err)),
            };

            let frame = decode_frame(&raw);
            if !frame.header().has_marker() {
                warn!(len = raw.len(), "incoming frame missing 00 FF marker");
            }
            if let Some(metrics) = self.metrics {
                metrics.record_frame_received(frame.message_type());
            }

            remaining = result.absorb(&frame, self.limits.max_response_len)?;
            debug!(
                type_byte = frame.header().type_byte(),
                declared = frame.declared_len(),
                chunk = frame.payload().len(),
                remaining,
                "frame read"
            );
        }

        Ok(result)
    }
}

//! Outgoing half of an exchange: chunk a command and write it frame by frame.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, instrument};

use crate::protocol::metrics::Metrics;
use crate::protocol::{Error, MAX_MESSAGE_LEN, REPORT_ID, Result, chunk_message};

use super::FeatureTransport;

/// Writes one command to the device.
///
/// Frames go out strictly one after another; a failed write aborts the rest of
/// the message and nothing is sent to cancel the partial transfer.
pub struct Transmitter<'a, T: FeatureTransport + ?Sized> {
    transport: &'a T,
    report_id: u8,
    max_message_len: usize,
    cancel: Option<&'a AtomicBool>,
    metrics: Option<&'a Metrics>,
}

impl<'a, T: FeatureTransport + ?Sized> Transmitter<'a, T> {
    /// Create a transmitter using the default report id and length bound.
    #[must_use]
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            report_id: REPORT_ID,
            max_message_len: MAX_MESSAGE_LEN,
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

    /// Tighten the outgoing length bound (never above 65535).
    #[must_use]
    pub fn max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max.min(MAX_MESSAGE_LEN);
        self
    }

    /// Abort before the next write once `flag` is set.
    #[must_use]
    pub fn cancel_on(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub(crate) fn metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Send `command` as UTF-8 text. Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyCommand`] / [`Error::MessageTooLong`] before any write
    /// - [`Error::TransportClosed`] if cancelled between frames
    /// - [`Error::TransportWriteFailed`] if the transport rejects a frame
    #[instrument(level = "trace", skip(self, command), fields(len = command.len()))]
    pub fn send(&self, command: &str) -> Result<usize> {
        let bytes = command.as_bytes();
        if bytes.len() > self.max_message_len {
            return Err(Error::MessageTooLong {
                len: bytes.len(),
                max: self.max_message_len,
            });
        }

        let frames = chunk_message(bytes)?;
        for frame in &frames {
            if self.cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
                return Err(Error::TransportClosed);
            }

            self.transport
                .write_feature_report(self.report_id, frame.as_bytes())
                .map_err(Error::TransportWriteFailed)?;

            if let Some(metrics) = self.metrics {
                metrics.record_frame_sent();
            }
            debug!(
                msg_type = %frame.message_type(),
                declared = frame.declared_len(),
                chunk = frame.chunk_len(),
                "frame written"
            );
        }

        Ok(frames.len())
    }
}

//! The device link the engine drives.

use std::sync::Arc;
use std::time::Duration;

use super::TransportError;

/// A bidirectional feature-report channel to one device.
///
/// Implementations wrap a HID handle (or a simulator). All methods take `&self`
/// so a session can close the link from one thread while another is blocked in
/// [`read_feature_report`](Self::read_feature_report); that read should then fail
/// promptly instead of waiting out its timeout.
///
/// The engine never issues two exchanges on the same session concurrently, but
/// it does not coordinate between sessions: give each device one session.
pub trait FeatureTransport: Send + Sync {
    /// Whether the handle is currently open.
    fn is_open(&self) -> bool;

    /// Open the handle. Called only when [`is_open`](Self::is_open) is false.
    fn open(&self) -> Result<(), TransportError>;

    /// Close the handle.
    fn close(&self) -> Result<(), TransportError>;

    /// Send one feature report. `data` excludes the report id.
    fn write_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError>;

    /// Fetch one feature report, waiting at most `timeout`.
    ///
    /// The returned buffer starts with the report id byte.
    fn read_feature_report(&self, report_id: u8, timeout: Duration)
    -> Result<Vec<u8>, TransportError>;
}

impl<T: FeatureTransport + ?Sized> FeatureTransport for Arc<T> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn open(&self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn write_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).write_feature_report(report_id, data)
    }

    fn read_feature_report(
        &self,
        report_id: u8,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_feature_report(report_id, timeout)
    }
}

impl<T: FeatureTransport + ?Sized> FeatureTransport for Box<T> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn open(&self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn write_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        (**self).write_feature_report(report_id, data)
    }

    fn read_feature_report(
        &self,
        report_id: u8,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_feature_report(report_id, timeout)
    }
}

//! Frame capture for protocol debugging (`debug-tools` feature).
//!
//! Wraps any [`FeatureTransport`] and appends every report that crosses it to a
//! PCAP file. Each record is `[direction][report id][frame bytes]`, with
//! direction `0` for host to device and `1` for device to host.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::{FeatureTransport, TransportError};

const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;
const PCAP_SNAPLEN: u32 = 65_535;
const LINKTYPE_USER0: u32 = 147;

const DIRECTION_OUT: u8 = 0;
const DIRECTION_IN: u8 = 1;

/// Transport decorator that records every frame.
pub struct CaptureTransport<T> {
    inner: T,
    file: Mutex<File>,
}

impl<T: FeatureTransport> CaptureTransport<T> {
    /// Wrap `inner`, truncating any existing capture at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created or its PCAP header
    /// cannot be written.
    #[must_use = "the capture file is only written through the returned transport"]
    pub fn create(inner: T, path: &Path) -> io::Result<Self> {
        let mut file = File::create(path)?;
        write_global_header(&mut file)?;
        Ok(Self {
            inner,
            file: Mutex::new(file),
        })
    }

    /// The wrapped transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    fn record(&self, direction: u8, report_id: u8, data: &[u8]) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = write_record(&mut file, SystemTime::now(), direction, report_id, data) {
            debug!(error = ?err, "failed to record frame");
        }
    }
}

impl<T: FeatureTransport> FeatureTransport for CaptureTransport<T> {
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn open(&self) -> Result<(), TransportError> {
        self.inner.open()
    }

    fn close(&self) -> Result<(), TransportError> {
        self.inner.close()
    }

    fn write_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        self.record(DIRECTION_OUT, report_id, data);
        self.inner.write_feature_report(report_id, data)
    }

    fn read_feature_report(
        &self,
        report_id: u8,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let frame = self.inner.read_feature_report(report_id, timeout)?;
        self.record(DIRECTION_IN, report_id, &frame);
        Ok(frame)
    }
}

impl<T> std::fmt::Debug for CaptureTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureTransport").finish_non_exhaustive()
    }
}

fn write_global_header(file: &mut File) -> io::Result<()> {
    let mut header = [0u8; 24];
    header[0..4].copy_from_slice(&PCAP_MAGIC.to_le_bytes());
    header[4..6].copy_from_slice(&PCAP_VERSION_MAJOR.to_le_bytes());
    header[6..8].copy_from_slice(&PCAP_VERSION_MINOR.to_le_bytes());
    // thiszone and sigfigs stay zero
    header[16..20].copy_from_slice(&PCAP_SNAPLEN.to_le_bytes());
    header[20..24].copy_from_slice(&LINKTYPE_USER0.to_le_bytes());
    file.write_all(&header)
}

fn write_record(
    file: &mut File,
    timestamp: SystemTime,
    direction: u8,
    report_id: u8,
    data: &[u8],
) -> io::Result<()> {
    let since_epoch = timestamp.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = u32::try_from(since_epoch.as_secs()).unwrap_or(u32::MAX);
    let usecs = since_epoch.subsec_micros();

    let data = &data[..data.len().min(PCAP_SNAPLEN as usize - 2)];
    let length = u32::try_from(data.len() + 2).unwrap_or(PCAP_SNAPLEN);

    let mut header = [0u8; 16];
    header[0..4].copy_from_slice(&secs.to_le_bytes());
    header[4..8].copy_from_slice(&usecs.to_le_bytes());
    header[8..12].copy_from_slice(&length.to_le_bytes());
    header[12..16].copy_from_slice(&length.to_le_bytes());

    file.write_all(&header)?;
    file.write_all(&[direction, report_id])?;
    file.write_all(data)?;
    file.flush()
}

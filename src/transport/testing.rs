//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::result::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::protocol::{FRAME_SIZE, MAX_INCOMING_CHUNK_SIZE, MessageType, REPORT_ID};

use super::{FeatureTransport, TransportError};

/// Build one incoming frame as the transport would return it.
pub(crate) fn frame(type_byte: u8, declared: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![REPORT_ID, 0x00, 0xFF, type_byte];
    frame.extend_from_slice(&declared.to_le_bytes());
    frame.extend_from_slice(payload);
    frame.resize(FRAME_SIZE, 0);
    frame
}

/// Split `text` into `FIRST`/`MID` frames the way the device does.
pub(crate) fn chunked(text: &str) -> Vec<Vec<u8>> {
    let bytes = text.as_bytes();
    bytes
        .chunks(MAX_INCOMING_CHUNK_SIZE)
        .enumerate()
        .map(|(index, chunk)| {
            let msg_type = if index == 0 {
                MessageType::First
            } else {
                MessageType::Mid
            };
            let remaining = bytes.len() - index * MAX_INCOMING_CHUNK_SIZE;
            frame(msg_type.as_u8(), u16::try_from(remaining).unwrap(), chunk)
        })
        .collect()
}

/// Single-frame `RESULT` reply.
pub(crate) fn result(text: &str) -> Vec<u8> {
    frame(
        MessageType::Result.as_u8(),
        u16::try_from(text.len()).unwrap(),
        text.as_bytes(),
    )
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    pub(crate) opened: AtomicBool,
    pub(crate) reads: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    pub(crate) writes: Mutex<Vec<Vec<u8>>>,
    pub(crate) fail_open: bool,
    pub(crate) fail_close: bool,
}

impl ScriptedTransport {
    pub(crate) fn opened() -> Self {
        let transport = Self::default();
        transport.opened.store(true, Ordering::SeqCst);
        transport
    }

    pub(crate) fn push(&self, frame: Vec<u8>) {
        self.reads.lock().unwrap().push_back(Ok(frame));
    }

    pub(crate) fn push_all(&self, frames: impl IntoIterator<Item = Vec<u8>>) {
        for frame in frames {
            self.push(frame);
        }
    }

    pub(crate) fn push_err(&self, err: TransportError) {
        self.reads.lock().unwrap().push_back(Err(err));
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl FeatureTransport for ScriptedTransport {
    fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    fn open(&self) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::Other("permission denied".into()));
        }
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.fail_close {
            return Err(TransportError::Other("busy".into()));
        }
        self.opened.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn write_feature_report(&self, _report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn read_feature_report(
        &self,
        _report_id: u8,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.reads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::Timeout))
    }
}

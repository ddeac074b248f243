//! In-memory device that speaks the device side of PTP.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use ptp::protocol::{FRAME_SIZE, MAX_CHUNK_SIZE, MAX_INCOMING_CHUNK_SIZE, MessageType, REPORT_ID};
use ptp::{FeatureTransport, TransportError};

/// How the device answers one command.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(String),
    Chunked(String),
    AckNoResponse,
    AckThenResult(String),
    Nack(String),
    Empty,
    Raw(Vec<Vec<u8>>),
    Silent,
}

type Handler = Box<dyn Fn(&str) -> Reply + Send + Sync>;

#[derive(Default)]
struct DeviceState {
    inbox: Vec<u8>,
    expecting: usize,
    writer: Option<ThreadId>,
    outbox: VecDeque<Vec<u8>>,
}

pub struct SimDevice {
    open: AtomicBool,
    state: Mutex<DeviceState>,
    signal: Condvar,
    handler: Handler,
    commands: Mutex<Vec<String>>,
    frames: Mutex<Vec<Vec<u8>>>,
    violations: AtomicUsize,
    write_delay: Duration,
}

pub fn default_reply(command: &str) -> Reply {
    match command {
        "init" => Reply::Result(r#"{"peer_id":"sim-1","version":"0.9.0"}"#.into()),
        "hb" | "config save" | "config revert" => Reply::AckNoResponse,
        "config get /a" => Reply::Result("true".into()),
        "sleep" => Reply::Silent,
        _ => match command.strip_prefix("echo ") {
            Some(text) => Reply::Chunked(serde_json::to_string(text).unwrap()),
            None => Reply::Nack(format!("unknown command: {command}")),
        },
    }
}

pub fn frame(type_byte: u8, declared: usize, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![REPORT_ID, 0x00, 0xFF, type_byte];
    frame.extend_from_slice(&u16::try_from(declared).unwrap().to_le_bytes());
    frame.extend_from_slice(payload);
    frame.resize(FRAME_SIZE, 0);
    frame
}

fn chunked(text: &str) -> Vec<Vec<u8>> {
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
            frame(
                msg_type.as_u8(),
                bytes.len() - index * MAX_INCOMING_CHUNK_SIZE,
                chunk,
            )
        })
        .collect()
}

impl Reply {
    fn into_frames(self) -> Vec<Vec<u8>> {
        match self {
            Self::Result(text) => vec![frame(6, text.len(), text.as_bytes())],
            Self::Chunked(text) => chunked(&text),
            Self::AckNoResponse => vec![frame(2, 0, b"")],
            Self::AckThenResult(text) => vec![frame(3, 0, b""), frame(6, text.len(), text.as_bytes())],
            Self::Nack(text) => vec![frame(4, text.len(), text.as_bytes())],
            Self::Empty => vec![frame(5, 0, b"")],
            Self::Raw(frames) => frames,
            Self::Silent => Vec::new(),
        }
    }
}

impl SimDevice {
    pub fn new() -> Self {
        Self::with_handler(default_reply)
    }

    pub fn with_handler(handler: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            open: AtomicBool::new(false),
            state: Mutex::new(DeviceState::default()),
            signal: Condvar::new(),
            handler: Box::new(handler),
            commands: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            violations: AtomicUsize::new(0),
            write_delay: Duration::ZERO,
        }
    }

    /// Sleep after every write, widening any window for interleaving.
    pub fn write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| *c == command).count()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    /// Frames written while another exchange was still in progress.
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    fn violation(&self, what: &str) {
        eprintln!("sim device: {what}");
        self.violations.fetch_add(1, Ordering::SeqCst);
    }
}

impl FeatureTransport for SimDevice {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn open(&self) -> Result<(), TransportError> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::SeqCst);
        let _state = self.state.lock().unwrap();
        self.signal.notify_all();
        Ok(())
    }

    fn write_feature_report(&self, report_id: u8, data: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        assert_eq!(report_id, REPORT_ID);
        assert_eq!(data.len(), FRAME_SIZE);
        self.frames.lock().unwrap().push(data.to_vec());

        let msg_type = MessageType::from_u8(data[2]).expect("host sends FIRST/MID only");
        let declared = usize::from(u16::from_le_bytes([data[3], data[4]]));
        let chunk = &data[5..5 + declared.min(MAX_CHUNK_SIZE)];
        let me = thread::current().id();

        {
            let mut state = self.state.lock().unwrap();
            if !state.outbox.is_empty() {
                self.violation("write while a response is pending");
                state.outbox.clear();
            }

            match msg_type {
                MessageType::First => {
                    if state.expecting > 0 {
                        self.violation("FIRST inside an unfinished message");
                    }
                    state.inbox.clear();
                    state.writer = Some(me);
                }
                MessageType::Mid => {
                    if state.expecting == 0 || state.writer != Some(me) {
                        self.violation("MID from a different exchange");
                    }
                }
                other => panic!("unexpected host message type {other}"),
            }

            state.inbox.extend_from_slice(chunk);
            state.expecting = declared - chunk.len();

            if state.expecting == 0 {
                let command = String::from_utf8(std::mem::take(&mut state.inbox)).unwrap();
                let frames = (self.handler)(&command).into_frames();
                self.commands.lock().unwrap().push(command);
                state.outbox.extend(frames);
                state.writer = None;
                self.signal.notify_all();
            }
        }

        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }
        Ok(())
    }

    fn read_feature_report(
        &self,
        report_id: u8,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        assert_eq!(report_id, REPORT_ID);
        let deadline = Instant::now() + timeout;

        let mut state = self.state.lock().unwrap();
        loop {
            if !self.is_open() {
                return Err(TransportError::NotOpen);
            }
            if let Some(frame) = state.outbox.pop_front() {
                return Ok(frame);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(TransportError::Timeout);
            }
            state = self.signal.wait_timeout(state, deadline - now).unwrap().0;
        }
    }
}

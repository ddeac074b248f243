//! Session lifecycle: open, serialized exchanges, heartbeat, close.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use std::thread::JoinHandle;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::protocol::metrics::{HeartbeatOutcome, Metrics};
use crate::protocol::{Command, Error, MetricsSnapshot, Result};

use super::keepalive::{self, Timer};
use super::receiver::{ReceiveLimits, Receiver};
use super::transmitter::Transmitter;
use super::{FeatureTransport, KeepAliveConfig, SessionConfig};

/// An open conversation with one device.
///
/// Every [`send`](Self::send) runs a full write-then-read exchange while holding
/// the session's exchange guard, so concurrent callers (and the heartbeat
/// thread) never interleave frames on the wire.
pub struct Session<T: FeatureTransport + 'static> {
    inner: Arc<SessionInner<T>>,
    device_info: Value,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
}

struct SessionInner<T: FeatureTransport> {
    transport: Arc<T>,
    config: SessionConfig,
    exchange: Mutex<()>,
    closed: AtomicBool,
    timer: Option<Arc<Timer>>,
    metrics: Metrics,
}

impl<T: FeatureTransport + 'static> Session<T> {
    /// Start configuring a session.
    #[must_use]
    pub fn builder() -> SessionBuilder<T> {
        SessionBuilder::new()
    }

    /// Open `transport` if needed, run the `init` handshake, and start the
    /// heartbeat when configured.
    ///
    /// If the handshake fails the transport is left open, so the caller may
    /// retry.
    #[instrument(level = "info", skip(transport, config))]
    pub fn open(transport: Arc<T>, config: SessionConfig) -> Result<Self> {
        if !transport.is_open() {
            transport.open().map_err(Error::TransportOpenFailed)?;
            debug!("transport opened");
        }

        let timer = config.keep_alive.map(|ka| Arc::new(Timer::new(ka)));
        let inner = Arc::new(SessionInner {
            transport,
            config,
            exchange: Mutex::new(()),
            closed: AtomicBool::new(false),
            timer,
            metrics: Metrics::default(),
        });

        let device_info = inner.exchange(&Command::Init.to_string())?;
        info!(device = %device_info, "session open");

        Ok(Self {
            keep_alive: Mutex::new(start_keep_alive(&inner)),
            device_info,
            inner,
        })
    }

    /// Response to the `init` handshake.
    ///
    /// Fields such as `peer_id` and `version` are the firmware's business; they
    /// are passed through untouched.
    #[must_use]
    pub fn device_info(&self) -> &Value {
        &self.device_info
    }

    /// Run one command and return the device's parsed response.
    ///
    /// `ACK_NRSP` and empty responses come back as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// - [`Error::NoConnectedDevice`] after [`close`](Self::close)
    /// - [`Error::DeviceNotOpened`] if the transport was closed underneath
    /// - [`Error::EmptyCommand`] / [`Error::MessageTooLong`] before any write
    /// - any transport or device error from the exchange itself
    #[instrument(level = "debug", skip(self, command), fields(len = command.len()))]
    pub fn send(&self, command: &str) -> Result<Value> {
        self.inner.exchange(command)
    }

    /// Run a typed command.
    pub fn execute(&self, command: &Command) -> Result<Value> {
        self.send(&command.to_string())
    }

    /// Push the next heartbeat out by a full interval. No-op without keep-alive.
    pub fn rearm_keep_alive(&self) {
        self.inner.rearm();
    }

    /// Stop the heartbeat, detach, and close the transport.
    ///
    /// An exchange blocked in another thread fails with
    /// [`Error::TransportClosed`]. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::TransportCloseFailed`] if the transport refuses to close.
    #[instrument(level = "info", skip(self))]
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(timer) = &self.inner.timer {
            timer.shutdown();
        }

        let transport = &self.inner.transport;
        let result = if transport.is_open() {
            transport.close().map_err(Error::TransportCloseFailed)
        } else {
            Ok(())
        };

        let handle = self
            .keep_alive
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("keep-alive thread panicked");
            }
        }

        info!(ok = result.is_ok(), "session closed");
        result
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// The transport this session drives.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.inner.transport
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Counters for this session.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl<T: FeatureTransport + 'static> Drop for Session<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close session on drop");
        }
    }
}

impl<T: FeatureTransport + 'static> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<T: FeatureTransport> SessionInner<T> {
    fn lock_exchange(&self) -> MutexGuard<'_, ()> {
        self.exchange.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_ready(&self, command: &str) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::NoConnectedDevice);
        }
        if !self.transport.is_open() {
            return Err(Error::DeviceNotOpened);
        }
        if command.is_empty() {
            return Err(Error::EmptyCommand);
        }
        Ok(())
    }

    fn exchange(&self, command: &str) -> Result<Value> {
        self.check_ready(command)?;
        let _guard = self.lock_exchange();
        self.exchange_locked(command)
    }

    /// Transmit then receive. Caller holds the exchange guard.
    fn exchange_locked(&self, command: &str) -> Result<Value> {
        // Re-check: close may have run while we waited for the guard.
        self.check_ready(command)?;

        let id = Uuid::new_v4();
        let span = tracing::debug_span!("exchange", id = %id.simple());
        let _entered = span.enter();

        let started = Instant::now();
        let result = self.transmit_and_receive(command);
        self.metrics.record_exchange(result.is_ok(), started.elapsed());

        match &result {
            Ok(_) => {
                debug!(elapsed_us = started.elapsed().as_micros(), "exchange complete");
                self.rearm();
            }
            Err(err) => debug!(error = %err, "exchange failed"),
        }
        result
    }

    fn transmit_and_receive(&self, command: &str) -> Result<Value> {
        let transport = self.transport.as_ref();

        Transmitter::new(transport)
            .report_id(self.config.report_id)
            .max_message_len(self.config.effective_max_message_len())
            .cancel_on(&self.closed)
            .metrics(&self.metrics)
            .send(command)?;

        Receiver::new(transport)
            .report_id(self.config.report_id)
            .limits(ReceiveLimits {
                read_timeout: self.config.read_timeout,
                exchange_timeout: self.config.exchange_timeout,
                max_response_len: self.config.max_response_len,
            })
            .cancel_on(&self.closed)
            .metrics(&self.metrics)
            .receive()?
            .into_value()
    }

    fn rearm(&self) {
        if let Some(timer) = &self.timer {
            timer.arm();
        }
    }

    /// One keep-alive tick. Failures are logged, never returned.
    fn heartbeat(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let _guard = match self.exchange.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                // The tick was consumed; the exchange in flight may still fail.
                self.metrics.record_heartbeat(HeartbeatOutcome::Skipped);
                self.rearm();
                return;
            }
        };

        match self.exchange_locked(&Command::Heartbeat.to_string()) {
            Ok(_) => self.metrics.record_heartbeat(HeartbeatOutcome::Ok),
            Err(err) => {
                warn!(error = %err, "heartbeat failed");
                self.metrics.record_heartbeat(HeartbeatOutcome::Failed);
                self.rearm();
            }
        }
    }
}

fn start_keep_alive<T: FeatureTransport + 'static>(
    inner: &Arc<SessionInner<T>>,
) -> Option<JoinHandle<()>> {
    let timer = Arc::clone(inner.timer.as_ref()?);
    let weak: Weak<SessionInner<T>> = Arc::downgrade(inner);

    let spawned = keepalive::spawn(Arc::clone(&timer), move || match weak.upgrade() {
        Some(inner) => {
            inner.heartbeat();
            true
        }
        None => false,
    });

    match spawned {
        Ok(handle) => {
            timer.arm();
            Some(handle)
        }
        Err(err) => {
            warn!(error = %err, "could not start keep-alive thread; continuing without it");
            None
        }
    }
}

/// Builder for [`Session`].
#[derive(Debug)]
pub struct SessionBuilder<T: FeatureTransport + 'static> {
    transport: Option<Arc<T>>,
    config: SessionConfig,
}

impl<T: FeatureTransport + 'static> SessionBuilder<T> {
    /// Create a builder with default configuration and no transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: None,
            config: SessionConfig::default(),
        }
    }

    /// Device to talk to.
    #[must_use]
    pub fn transport(mut self, transport: Arc<T>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable heartbeats.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.config.keep_alive = Some(keep_alive);
        self
    }

    /// Open the session.
    ///
    /// # Errors
    ///
    /// [`Error::NoDeviceSpecified`] if no transport was set, otherwise as
    /// [`Session::open`].
    pub fn open(self) -> Result<Session<T>> {
        let transport = self.transport.ok_or(Error::NoDeviceSpecified)?;
        Session::open(transport, self.config)
    }
}

impl<T: FeatureTransport + 'static> Default for SessionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{ScriptedTransport, frame, result};
    use crate::protocol::MessageType;
    use serde_json::json;

    fn open_with(transport: ScriptedTransport) -> (Arc<ScriptedTransport>, Session<ScriptedTransport>) {
        let transport = Arc::new(transport);
        transport.push(result(r#"{"peer_id":"abc","version":"1.2.0"}"#));
        let session = Session::open(Arc::clone(&transport), SessionConfig::default()).unwrap();
        (transport, session)
    }

    #[test]
    fn test_open_runs_init() {
        let (transport, session) = open_with(ScriptedTransport::default());

        assert!(transport.is_open());
        assert_eq!(session.device_info()["peer_id"], "abc");

        let writes = transport.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(&writes[0][5..9], b"init");
    }

    #[test]
    fn test_open_failure_wrapped() {
        let transport = Arc::new(ScriptedTransport {
            fail_open: true,
            ..ScriptedTransport::default()
        });
        let result = Session::open(transport, SessionConfig::default());
        assert!(matches!(result, Err(Error::TransportOpenFailed(_))));
    }

    #[test]
    fn test_builder_requires_transport() {
        let result = SessionBuilder::<ScriptedTransport>::new().open();
        assert!(matches!(result, Err(Error::NoDeviceSpecified)));
    }

    #[test]
    fn test_send_returns_parsed_json() {
        let (transport, session) = open_with(ScriptedTransport::default());
        transport.push(result("true"));

        assert_eq!(session.send("config get /a").unwrap(), json!(true));
        assert_eq!(session.metrics().exchanges_ok, 2);
    }

    #[test]
    fn test_send_rejects_empty_command() {
        let (transport, session) = open_with(ScriptedTransport::default());
        let before = transport.write_count();

        assert!(matches!(session.send(""), Err(Error::EmptyCommand)));
        assert_eq!(transport.write_count(), before);
    }

    #[test]
    fn test_send_on_unopened_transport() {
        let (transport, session) = open_with(ScriptedTransport::default());
        transport.close().unwrap();
        let before = transport.write_count();

        assert!(matches!(session.send("hb"), Err(Error::DeviceNotOpened)));
        assert_eq!(transport.write_count(), before);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (transport, session) = open_with(ScriptedTransport::default());

        session.close().unwrap();
        assert!(session.is_closed());
        assert!(!transport.is_open());
        session.close().unwrap();

        assert!(matches!(session.send("hb"), Err(Error::NoConnectedDevice)));
    }

    #[test]
    fn test_close_failure_wrapped() {
        let (_transport, session) = open_with(ScriptedTransport {
            fail_close: true,
            ..ScriptedTransport::default()
        });
        assert!(matches!(
            session.close(),
            Err(Error::TransportCloseFailed(_))
        ));
    }

    #[test]
    fn test_device_error_does_not_close_session() {
        let (transport, session) = open_with(ScriptedTransport::default());
        transport.push(frame(MessageType::Nack.as_u8(), 8, b"bad path"));
        transport.push(frame(MessageType::AckNoResponse.as_u8(), 0, b""));

        let err = session.send("config get /missing").unwrap_err();
        assert_eq!(err.to_string(), "bad path");
        assert_eq!(session.send("config save").unwrap(), Value::Null);
        assert_eq!(session.metrics().exchanges_failed, 1);
    }

    #[test]
    fn test_execute_renders_command() {
        let (transport, session) = open_with(ScriptedTransport::default());
        transport.push(frame(MessageType::AckNoResponse.as_u8(), 0, b""));

        session.execute(&Command::Practice(true)).unwrap();
        let writes = transport.writes.lock().unwrap();
        assert_eq!(&writes[1][5..16], b"practice on");
    }
}

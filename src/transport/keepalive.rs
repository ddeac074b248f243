//! Re-armable heartbeat timer.
//!
//! One background thread per session sleeps until the armed deadline, then runs
//! the tick callback. Any successful exchange pushes the deadline out again.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::trace;
use uuid::Uuid;

use super::KeepAliveConfig;

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

/// Shared deadline between the session and its heartbeat thread.
#[derive(Debug)]
pub(crate) struct Timer {
    config: KeepAliveConfig,
    state: Mutex<TimerState>,
    signal: Condvar,
}

impl Timer {
    pub(crate) fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            state: Mutex::new(TimerState::default()),
            signal: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule the next tick `interval + jitter` from now.
    pub(crate) fn arm(&self) {
        let delay = self.config.interval + jitter(self.config.jitter);
        let mut state = self.lock();
        if state.shutdown {
            return;
        }
        state.deadline = Some(Instant::now() + delay);
        trace!(delay_ms = delay.as_millis(), "keep-alive armed");
        self.signal.notify_all();
    }

    /// Stop the thread for good; pending ticks are dropped.
    pub(crate) fn shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        state.deadline = None;
        self.signal.notify_all();
    }

    #[cfg(test)]
    fn deadline(&self) -> Option<Instant> {
        self.lock().deadline
    }

    /// Block until the deadline passes (`true`) or the timer shuts down (`false`).
    ///
    /// The deadline is consumed, so a tick happens at most once per `arm`.
    fn wait_for_tick(&self) -> bool {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return false;
            }
            let deadline = state.deadline;
            state = match deadline {
                None => self
                    .signal
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        state.deadline = None;
                        return true;
                    }
                    self.signal
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

/// Spawn the heartbeat thread. It exits once the timer shuts down or `tick`
/// returns `false`.
pub(crate) fn spawn<F>(timer: Arc<Timer>, mut tick: F) -> io::Result<JoinHandle<()>>
where
    F: FnMut() -> bool + Send + 'static,
{
    thread::Builder::new()
        .name("ptp-keepalive".into())
        .spawn(move || {
            while timer.wait_for_tick() {
                if !tick() {
                    break;
                }
            }
            trace!("keep-alive thread exiting");
        })
}

fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let (random, _) = Uuid::new_v4().as_u64_pair();
    Duration::from_millis(random % max_ms.saturating_add(1))
}

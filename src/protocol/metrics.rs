use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::MessageType;

/// Per-session PTP counters, no external dependencies.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    exchanges_ok: AtomicU64,
    exchanges_failed: AtomicU64,
    heartbeats_ok: AtomicU64,
    heartbeats_failed: AtomicU64,
    heartbeats_skipped: AtomicU64,
    exchange_latency_total_ns: AtomicU64,
    exchange_latency_max_ns: AtomicU64,
    received_by_type: MessageTypeCounters,
}

const NANOSECONDS_PER_MICROSECOND: u128 = 1_000;

#[derive(Debug, Default)]
struct MessageTypeCounters {
    first: AtomicU64,
    mid: AtomicU64,
    ack_no_response: AtomicU64,
    ack_response: AtomicU64,
    nack: AtomicU64,
    empty: AtomicU64,
    result: AtomicU64,
    unknown: AtomicU64,
}

impl MessageTypeCounters {
    fn increment(&self, msg_type: Option<MessageType>) {
        let counter = match msg_type {
            Some(MessageType::First) => &self.first,
            Some(MessageType::Mid) => &self.mid,
            Some(MessageType::AckNoResponse) => &self.ack_no_response,
            Some(MessageType::AckResponse) => &self.ack_response,
            Some(MessageType::Nack) => &self.nack,
            Some(MessageType::Empty) => &self.empty,
            Some(MessageType::Result) => &self.result,
            None => &self.unknown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of a keep-alive tick.
#[derive(Clone, Copy, Debug)]
pub(crate) enum HeartbeatOutcome {
    Ok,
    Failed,
    Skipped,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_frame_received(&self, msg_type: Option<MessageType>) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.received_by_type.increment(msg_type);
    }

    #[inline]
    pub(crate) fn record_exchange(&self, ok: bool, duration: Duration) {
        if ok {
            self.exchanges_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.exchanges_failed.fetch_add(1, Ordering::Relaxed);
        }

        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.exchange_latency_total_ns
            .fetch_add(nanos, Ordering::Relaxed);
        update_max(&self.exchange_latency_max_ns, nanos);
    }

    #[inline]
    pub(crate) fn record_heartbeat(&self, outcome: HeartbeatOutcome) {
        let counter = match outcome {
            HeartbeatOutcome::Ok => &self.heartbeats_ok,
            HeartbeatOutcome::Failed => &self.heartbeats_failed,
            HeartbeatOutcome::Skipped => &self.heartbeats_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let by_type = &self.received_by_type;
        MetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            exchanges_ok: self.exchanges_ok.load(Ordering::Relaxed),
            exchanges_failed: self.exchanges_failed.load(Ordering::Relaxed),
            heartbeats_ok: self.heartbeats_ok.load(Ordering::Relaxed),
            heartbeats_failed: self.heartbeats_failed.load(Ordering::Relaxed),
            heartbeats_skipped: self.heartbeats_skipped.load(Ordering::Relaxed),
            exchange_latency_total_ns: self.exchange_latency_total_ns.load(Ordering::Relaxed),
            exchange_latency_max_ns: self.exchange_latency_max_ns.load(Ordering::Relaxed),
            received_nack: by_type.nack.load(Ordering::Relaxed),
            received_empty: by_type.empty.load(Ordering::Relaxed),
            received_unknown: by_type.unknown.load(Ordering::Relaxed),
            received_chunks: by_type.first.load(Ordering::Relaxed)
                + by_type.mid.load(Ordering::Relaxed),
            received_acks: by_type.ack_no_response.load(Ordering::Relaxed)
                + by_type.ack_response.load(Ordering::Relaxed),
            received_results: by_type.result.load(Ordering::Relaxed),
        }
    }
}

fn update_max(target: &AtomicU64, candidate: u64) {
    let mut current = target.load(Ordering::Relaxed);
    while candidate > current {
        match target.compare_exchange_weak(
            current,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(old) => current = old,
        }
    }
}

/// Point-in-time copy of one session's counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub exchanges_ok: u64,
    pub exchanges_failed: u64,
    pub heartbeats_ok: u64,
    pub heartbeats_failed: u64,
    pub heartbeats_skipped: u64,
    pub exchange_latency_total_ns: u64,
    pub exchange_latency_max_ns: u64,
    pub received_chunks: u64,
    pub received_acks: u64,
    pub received_results: u64,
    pub received_nack: u64,
    pub received_empty: u64,
    pub received_unknown: u64,
}

impl MetricsSnapshot {
    /// Average exchange latency in microseconds.
    #[must_use]
    pub fn avg_exchange_latency_us(&self) -> Option<u64> {
        let count = self.exchanges_ok + self.exchanges_failed;
        if count == 0 {
            return None;
        }

        let avg = u128::from(self.exchange_latency_total_ns)
            / (u128::from(count) * NANOSECONDS_PER_MICROSECOND);
        Some(u64::try_from(avg).unwrap_or(u64::MAX))
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::info;

const MAX_SAMPLES: usize = 256;

/// Which branch(es) a dual-send resolved through, folded from
/// [`hypo_transport::SendOutcome`] into the four buckets §4.11 wants
/// counted (C11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcomeKind {
    LanOnly,
    CloudOnly,
    Both,
    Neither,
}

impl From<Option<hypo_transport::SendOutcome>> for SendOutcomeKind {
    fn from(outcome: Option<hypo_transport::SendOutcome>) -> Self {
        match outcome {
            Some(hypo_transport::SendOutcome { lan_ok: true, cloud_ok: true }) => Self::Both,
            Some(hypo_transport::SendOutcome { lan_ok: true, cloud_ok: false }) => Self::LanOnly,
            Some(hypo_transport::SendOutcome { lan_ok: false, cloud_ok: true }) => Self::CloudOnly,
            _ => Self::Neither,
        }
    }
}

/// In-process counters and duration samples for the sync pipeline (§4.11,
/// C11): handshake duration, round-trip duration, dual-send outcome
/// counts, and pinning-failure counts. No exporter lives here — a host
/// process reads these directly; anything Prometheus-shaped is the relay's
/// job, out of scope for this crate.
#[derive(Default)]
pub struct Metrics {
    lan_only: AtomicU64,
    cloud_only: AtomicU64,
    both: AtomicU64,
    neither: AtomicU64,
    pinning_failures: AtomicU64,
    handshake_durations: Mutex<Vec<Duration>>,
    round_trip_durations: Mutex<Vec<Duration>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send_outcome(&self, outcome: SendOutcomeKind) {
        let counter = match outcome {
            SendOutcomeKind::LanOnly => &self.lan_only,
            SendOutcomeKind::CloudOnly => &self.cloud_only,
            SendOutcomeKind::Both => &self.both,
            SendOutcomeKind::Neither => &self.neither,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        info!(outcome = ?outcome, "dual-send outcome recorded");
    }

    pub fn record_pinning_failure(&self) {
        self.pinning_failures.fetch_add(1, Ordering::Relaxed);
        info!("certificate pinning failure recorded");
    }

    pub fn record_handshake_duration(&self, duration: Duration) {
        push_sample(&self.handshake_durations, duration);
        info!(duration_ms = duration.as_millis() as u64, "handshake duration recorded");
    }

    pub fn record_round_trip_duration(&self, duration: Duration) {
        push_sample(&self.round_trip_durations, duration);
        info!(duration_ms = duration.as_millis() as u64, "round-trip duration recorded");
    }

    /// `(lan_only, cloud_only, both, neither)`.
    pub fn send_outcome_counts(&self) -> (u64, u64, u64, u64) {
        (
            self.lan_only.load(Ordering::Relaxed),
            self.cloud_only.load(Ordering::Relaxed),
            self.both.load(Ordering::Relaxed),
            self.neither.load(Ordering::Relaxed),
        )
    }

    pub fn pinning_failure_count(&self) -> u64 {
        self.pinning_failures.load(Ordering::Relaxed)
    }

    pub fn handshake_durations(&self) -> Vec<Duration> {
        self.handshake_durations.lock().unwrap().clone()
    }

    pub fn round_trip_durations(&self) -> Vec<Duration> {
        self.round_trip_durations.lock().unwrap().clone()
    }
}

fn push_sample(samples: &Mutex<Vec<Duration>>, duration: Duration) {
    let mut guard = samples.lock().unwrap();
    if guard.len() >= MAX_SAMPLES {
        guard.remove(0);
    }
    guard.push(duration);
}

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use hypo_core::ids::DeviceId;

/// `(origin_device_id, content_hash)` — the same pair
/// [`hypo_core::clipboard::ClipboardEntry::dedup_key`] produces.
pub type Signature = (DeviceId, String);

const CAPACITY: usize = 64;
const RETENTION: Duration = Duration::from_secs(5);

/// Fixed-size recent-signatures window that suppresses echoes before they
/// reach the history store (§4.9: "entries whose signature already appears
/// in the window within the last 5 seconds are dropped before
/// persistence"). Same bounded-eviction shape as
/// `hypo_pairing::ReplayGuard`, plus a retention check a plain replay guard
/// doesn't need: a signature that aged out of the window is fair game
/// again even before it's been evicted by capacity.
pub struct EchoWindow {
    capacity: usize,
    retention: Duration,
    order: VecDeque<Signature>,
    seen: HashMap<Signature, Instant>,
}

impl EchoWindow {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self { capacity, retention, order: VecDeque::with_capacity(capacity), seen: HashMap::with_capacity(capacity) }
    }

    /// The §4.9-mandated 64-entry, 5-second window.
    pub fn bounded() -> Self {
        Self::new(CAPACITY, RETENTION)
    }

    /// Returns `true` if `signature` was already seen within the retention
    /// window (caller should drop the entry). Always records the sighting,
    /// refreshing its position so the most recently seen signature is the
    /// last one evicted.
    pub fn is_recent_echo(&mut self, signature: Signature) -> bool {
        let is_echo = self.seen.get(&signature).is_some_and(|seen_at| seen_at.elapsed() < self.retention);

        if let Some(pos) = self.order.iter().position(|existing| existing == &signature) {
            self.order.remove(pos);
        } else if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(signature.clone());
        self.seen.insert(signature, Instant::now());

        is_echo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(n: u8) -> Signature {
        (DeviceId::parse(&format!("{n:032x}")).unwrap(), format!("hash-{n}"))
    }

    #[test]
    fn fresh_signature_is_not_an_echo() {
        let mut window = EchoWindow::bounded();
        assert!(!window.is_recent_echo(sig(1)));
    }

    #[test]
    fn same_signature_within_retention_is_an_echo() {
        let mut window = EchoWindow::bounded();
        assert!(!window.is_recent_echo(sig(1)));
        assert!(window.is_recent_echo(sig(1)));
    }

    #[test]
    fn same_signature_after_retention_window_is_not_an_echo() {
        let mut window = EchoWindow::new(CAPACITY, Duration::from_millis(20));
        assert!(!window.is_recent_echo(sig(1)));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!window.is_recent_echo(sig(1)));
    }

    #[test]
    fn distinct_signatures_do_not_collide() {
        let mut window = EchoWindow::bounded();
        assert!(!window.is_recent_echo(sig(1)));
        assert!(!window.is_recent_echo(sig(2)));
    }

    #[test]
    fn capacity_evicts_oldest_signature() {
        let mut window = EchoWindow::new(2, Duration::from_secs(5));
        assert!(!window.is_recent_echo(sig(1)));
        assert!(!window.is_recent_echo(sig(2)));
        assert!(!window.is_recent_echo(sig(3)));
        // sig(1) was evicted to make room for sig(3), so it reads as fresh again.
        assert!(!window.is_recent_echo(sig(1)));
    }
}

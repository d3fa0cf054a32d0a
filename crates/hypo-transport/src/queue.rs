use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;

use hypo_core::network::SyncEnvelope;

/// Minimum queue depth per peer connection (§4.5/§4.6: "bounded send queue,
/// capacity ≥ 64, backpressure on full").
pub const DEFAULT_CAPACITY: usize = 64;

/// A message older than this is dropped rather than retried further
/// (§4.6: "per-message retry for up to 10 minutes wall time; overdue
/// messages are dropped").
pub const MAX_RETRY_AGE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
#[error("outbound queue is full")]
pub struct QueueFullError;

/// Producer half. Cheap to clone; every [`LanConnection`](crate::LanConnection)
/// and [`CloudClient`](crate::CloudClient) owns one per peer/connection.
#[derive(Clone)]
pub struct OutboundQueue {
    sender: mpsc::Sender<(SyncEnvelope, Instant)>,
}

pub struct OutboundReceiver {
    receiver: mpsc::Receiver<(SyncEnvelope, Instant)>,
}

impl OutboundQueue {
    pub fn with_capacity(capacity: usize) -> (Self, OutboundReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, OutboundReceiver { receiver })
    }

    pub fn bounded() -> (Self, OutboundReceiver) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Non-blocking enqueue; returns [`QueueFullError`] once the bound is
    /// hit rather than growing unbounded.
    pub fn try_enqueue(&self, envelope: SyncEnvelope) -> Result<(), QueueFullError> {
        self.sender.try_send((envelope, Instant::now())).map_err(|_| QueueFullError)
    }
}

fn is_expired(enqueued_at: Instant) -> bool {
    enqueued_at.elapsed() > MAX_RETRY_AGE
}

impl OutboundReceiver {
    /// Waits for the next message, silently discarding any that have aged
    /// past [`MAX_RETRY_AGE`] while sitting in the queue.
    pub async fn recv_fresh(&mut self) -> Option<SyncEnvelope> {
        loop {
            let (envelope, enqueued_at) = self.receiver.recv().await?;
            if !is_expired(enqueued_at) {
                return Some(envelope);
            }
            tracing::debug!(envelope_id = %envelope.id, "dropping outbound envelope past max retry age");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypo_core::ids::{DeviceId, EnvelopeId};
    use hypo_core::network::{EncryptionMetadata, EnvelopePayload, MessageType};

    fn sample() -> SyncEnvelope {
        SyncEnvelope {
            id: EnvelopeId::new(),
            message_type: MessageType::Clipboard,
            payload: EnvelopePayload {
                content_type: "text".into(),
                ciphertext: vec![1, 2, 3],
                device_id: DeviceId::generate(),
                target: DeviceId::generate(),
                encryption: EncryptionMetadata::plaintext(),
            },
        }
    }

    #[tokio::test]
    async fn enqueued_message_is_received() {
        let (queue, mut rx) = OutboundQueue::with_capacity(4);
        queue.try_enqueue(sample()).unwrap();
        assert!(rx.recv_fresh().await.is_some());
    }

    #[tokio::test]
    async fn full_queue_applies_backpressure() {
        let (queue, _rx) = OutboundQueue::with_capacity(1);
        queue.try_enqueue(sample()).unwrap();
        assert!(matches!(queue.try_enqueue(sample()), Err(QueueFullError)));
    }

    #[test]
    fn fresh_enqueue_time_is_not_expired() {
        assert!(!is_expired(Instant::now()));
    }

    #[test]
    fn enqueue_time_past_max_retry_age_is_expired() {
        let past = Instant::now().checked_sub(MAX_RETRY_AGE + Duration::from_secs(1)).unwrap();
        assert!(is_expired(past));
    }
}

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use hypo_codec::{decode_frame, encode_frame};
use hypo_core::ids::DeviceId;
use hypo_core::network::SyncEnvelope;
use hypo_discovery::BackoffSchedule;

use crate::queue::{OutboundQueue, OutboundReceiver};

/// One per-peer connection's lifecycle (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanState {
    Idle,
    Connecting,
    Open,
    Backoff,
    Stopped,
}

impl LanState {
    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Backoff,
            _ => Self::Stopped,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Open => 2,
            Self::Backoff => 3,
            Self::Stopped => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanConfig {
    /// Close the connection after this long without traffic in either
    /// direction (§4.5, default 30 s).
    pub idle_timeout: Duration,
    pub backoff: BackoffSchedule,
    pub queue_capacity: usize,
}

impl Default for LanConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            backoff: BackoffSchedule::new(Duration::from_secs(1), Duration::from_secs(30), 8),
            queue_capacity: crate::queue::DEFAULT_CAPACITY,
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Supervises at most one outbound WebSocket connection to a single LAN
/// peer: connect, run the send/receive loop until idle or broken, then back
/// off and retry (§4.5). Query strings are stripped before dialing since
/// some LAN mDNS/DNS-SD stacks misroute them.
pub struct LanConnection {
    peer_id: DeviceId,
    state: Arc<AtomicU8>,
    outbound: OutboundQueue,
}

impl LanConnection {
    pub fn connect(
        peer_id: DeviceId,
        mut url: Url,
        config: LanConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEnvelope>) {
        url.set_query(None);

        let state = Arc::new(AtomicU8::new(LanState::Idle.tag()));
        let (outbound, outbound_rx) = OutboundQueue::with_capacity(config.queue_capacity);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let task_state = state.clone();
        let task_peer_id = peer_id.clone();
        tokio::spawn(async move {
            run_supervisor(task_peer_id, url, config, task_state, outbound_rx, inbound_tx).await;
        });

        (Self { peer_id, state, outbound }, inbound_rx)
    }

    pub fn peer_id(&self) -> &DeviceId {
        &self.peer_id
    }

    pub fn state(&self) -> LanState {
        LanState::from_tag(self.state.load(Ordering::SeqCst))
    }

    pub fn send(&self, envelope: SyncEnvelope) -> bool {
        self.outbound.try_enqueue(envelope).is_ok()
    }

    pub fn stop(&self) {
        self.state.store(LanState::Stopped.tag(), Ordering::SeqCst);
    }
}

async fn run_supervisor(
    peer_id: DeviceId,
    url: Url,
    config: LanConfig,
    state: Arc<AtomicU8>,
    mut outbound_rx: OutboundReceiver,
    inbound_tx: mpsc::UnboundedSender<SyncEnvelope>,
) {
    let mut attempt = 0u32;

    loop {
        if LanState::from_tag(state.load(Ordering::SeqCst)) == LanState::Stopped {
            return;
        }

        state.store(LanState::Connecting.tag(), Ordering::SeqCst);
        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                attempt = 0;
                state.store(LanState::Open.tag(), Ordering::SeqCst);
                debug!(peer = %peer_id, "LAN connection open");
                run_session(stream, &config, &mut outbound_rx, &inbound_tx).await;
            }
            Err(error) => {
                warn!(peer = %peer_id, %error, "LAN connect failed");
            }
        }

        if LanState::from_tag(state.load(Ordering::SeqCst)) == LanState::Stopped {
            return;
        }
        if attempt >= config.backoff.max_attempts() {
            return;
        }
        state.store(LanState::Backoff.tag(), Ordering::SeqCst);
        tokio::time::sleep(config.backoff.delay_for(attempt)).await;
        attempt += 1;
    }
}

async fn run_session(
    stream: WsStream,
    config: &LanConfig,
    outbound_rx: &mut OutboundReceiver,
    inbound_tx: &mpsc::UnboundedSender<SyncEnvelope>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            envelope = outbound_rx.recv_fresh() => {
                let Some(envelope) = envelope else { return };
                match encode_frame(&envelope) {
                    Ok(wire) => {
                        if sink.send(Message::Binary(wire)).await.is_err() {
                            return;
                        }
                    }
                    Err(error) => warn!(%error, "failed to encode outbound envelope"),
                }
            }
            message = source.next() => {
                match message {
                    Some(Ok(Message::Binary(bytes))) => match decode_frame(&bytes) {
                        Ok(envelope) => {
                            if inbound_tx.send(envelope).is_err() {
                                return;
                            }
                        }
                        Err(error) => warn!(%error, "dropping malformed LAN frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(%error, "LAN connection error");
                        return;
                    }
                }
            }
            _ = tokio::time::sleep(config.idle_timeout) => {
                debug!("LAN connection idle-closed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tag_round_trips() {
        for state in [LanState::Idle, LanState::Connecting, LanState::Open, LanState::Backoff, LanState::Stopped] {
            assert_eq!(LanState::from_tag(state.tag()), state);
        }
    }

    #[tokio::test]
    async fn sending_after_stop_still_queues_but_state_reports_stopped() {
        let (connection, _rx) = LanConnection::connect(
            DeviceId::generate(),
            Url::parse("ws://127.0.0.1:1/never-resolves").unwrap(),
            LanConfig { backoff: BackoffSchedule::new(Duration::from_millis(1), Duration::from_millis(5), 0), ..Default::default() },
        );
        connection.stop();
        assert_eq!(connection.state(), LanState::Stopped);
    }
}

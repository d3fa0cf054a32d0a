use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rustls::ClientConfig;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::Connector;
use tracing::{debug, warn};
use url::Url;

use hypo_codec::{decode_frame, encode_frame};
use hypo_core::errors::TransportError;
use hypo_core::ids::DeviceId;
use hypo_core::network::SyncEnvelope;
use hypo_discovery::BackoffSchedule;

use crate::pinning::FingerprintVerifier;
use crate::queue::{OutboundQueue, OutboundReceiver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudState {
    Idle,
    Connecting,
    Open,
    Receiving,
    Backoff,
    Stopped,
}

impl CloudState {
    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Receiving,
            4 => Self::Backoff,
            _ => Self::Stopped,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Open => 2,
            Self::Receiving => 3,
            Self::Backoff => 4,
            Self::Stopped => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub url: Url,
    pub device_id: DeviceId,
    pub platform: String,
    pub client_version: String,
    pub pinned_fingerprint_sha256: String,
    pub ping_interval: Duration,
    pub backoff: BackoffSchedule,
    pub queue_capacity: usize,
}

impl CloudConfig {
    /// The §4.6 reconnect schedule: 1,2,4,...cap 128 s, max 8 attempts.
    pub fn default_backoff() -> BackoffSchedule {
        BackoffSchedule::new(Duration::from_secs(1), Duration::from_secs(128), 8)
    }
}

/// Single long-lived WebSocket to the cloud relay (§4.6). Unlike
/// [`crate::LanConnection`], the query string in `url` is preserved when
/// dialing — the relay uses it for routing.
pub struct CloudClient {
    state: Arc<AtomicU8>,
    outbound: OutboundQueue,
    pinning_failed: Arc<std::sync::atomic::AtomicBool>,
    host: String,
}

impl CloudClient {
    pub fn connect(config: CloudConfig) -> (Self, mpsc::UnboundedReceiver<SyncEnvelope>) {
        let state = Arc::new(AtomicU8::new(CloudState::Idle.tag()));
        let pinning_failed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let host = config.url.host_str().unwrap_or("cloud relay").to_string();
        let (outbound, outbound_rx) = OutboundQueue::with_capacity(config.queue_capacity);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let task_state = state.clone();
        let task_pinning_failed = pinning_failed.clone();
        tokio::spawn(async move {
            run_supervisor(config, task_state, task_pinning_failed, outbound_rx, inbound_tx).await;
        });

        (Self { state, outbound, pinning_failed, host }, inbound_rx)
    }

    pub fn state(&self) -> CloudState {
        CloudState::from_tag(self.state.load(Ordering::SeqCst))
    }

    pub fn send(&self, envelope: SyncEnvelope) -> bool {
        self.outbound.try_enqueue(envelope).is_ok()
    }

    /// `true` once the pinned certificate has ever failed to match — the
    /// caller should treat this peer's cloud path as untrustworthy rather
    /// than silently retrying forever.
    pub fn pinning_failed(&self) -> bool {
        self.pinning_failed.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.state.store(CloudState::Stopped.tag(), Ordering::SeqCst);
    }

    pub fn last_error_if_pinning_failure(&self) -> Option<TransportError> {
        self.pinning_failed().then(|| TransportError::PinningFailure(self.host.clone()))
    }
}

fn build_request(config: &CloudConfig) -> Result<Request<()>, tokio_tungstenite::tungstenite::Error> {
    let host = config.url.host_str().unwrap_or_default();
    Request::builder()
        .method("GET")
        .uri(config.url.as_str())
        .header("Host", host)
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Sec-WebSocket-Version", "13")
        .header("Sec-WebSocket-Key", generate_key())
        .header("X-Device-Id", config.device_id.as_str())
        .header("X-Device-Platform", &config.platform)
        .header("X-Client-Version", &config.client_version)
        .body(())
        .map_err(tokio_tungstenite::tungstenite::Error::HttpFormat)
}

async fn run_supervisor(
    config: CloudConfig,
    state: Arc<AtomicU8>,
    pinning_failed: Arc<std::sync::atomic::AtomicBool>,
    mut outbound_rx: OutboundReceiver,
    inbound_tx: mpsc::UnboundedSender<SyncEnvelope>,
) {
    let mut attempt = 0u32;

    loop {
        if CloudState::from_tag(state.load(Ordering::SeqCst)) == CloudState::Stopped {
            return;
        }

        state.store(CloudState::Connecting.tag(), Ordering::SeqCst);
        let (verifier, mismatch) = FingerprintVerifier::new(config.pinned_fingerprint_sha256.clone());
        let tls_config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth();
        let connector = Connector::Rustls(Arc::new(tls_config));

        let request = match build_request(&config) {
            Ok(r) => r,
            Err(error) => {
                warn!(%error, "failed to build cloud connect request");
                return;
            }
        };

        match tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(connector)).await {
            Ok((stream, _response)) => {
                attempt = 0;
                state.store(CloudState::Open.tag(), Ordering::SeqCst);
                debug!("cloud connection open");
                state.store(CloudState::Receiving.tag(), Ordering::SeqCst);
                run_session(stream, &config, &mut outbound_rx, &inbound_tx).await;
            }
            Err(error) => {
                if mismatch.was_triggered() {
                    pinning_failed.store(true, Ordering::SeqCst);
                    warn!("cloud certificate pinning failed, aborting reconnect loop");
                    state.store(CloudState::Stopped.tag(), Ordering::SeqCst);
                    return;
                }
                warn!(%error, "cloud connect failed");
            }
        }

        if CloudState::from_tag(state.load(Ordering::SeqCst)) == CloudState::Stopped {
            return;
        }
        if attempt >= config.backoff.max_attempts() {
            return;
        }
        state.store(CloudState::Backoff.tag(), Ordering::SeqCst);
        tokio::time::sleep(config.backoff.delay_for(attempt)).await;
        attempt += 1;
    }
}

async fn run_session<S>(
    stream: tokio_tungstenite::WebSocketStream<S>,
    config: &CloudConfig,
    outbound_rx: &mut OutboundReceiver,
    inbound_tx: &mpsc::UnboundedSender<SyncEnvelope>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut source) = stream.split();
    let mut ping_ticker = tokio::time::interval(config.ping_interval);
    ping_ticker.tick().await;
    // A pong is due within one ping interval of being requested; allow a
    // second interval of slack before treating the connection as dead
    // (§4.6: "a failed pong triggers disconnect and reconnection").
    let pong_timeout = config.ping_interval * 2;
    let mut last_pong = tokio::time::Instant::now();

    loop {
        tokio::select! {
            _ = ping_ticker.tick() => {
                if last_pong.elapsed() > pong_timeout {
                    warn!(?pong_timeout, "no pong received from cloud relay, disconnecting");
                    return;
                }
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    return;
                }
            }
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
                        Err(error) => warn!(%error, "dropping malformed cloud frame"),
                    },
                    Some(Ok(Message::Pong(_))) => { last_pong = tokio::time::Instant::now(); }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(%error, "cloud connection error");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tag_round_trips() {
        for state in [
            CloudState::Idle,
            CloudState::Connecting,
            CloudState::Open,
            CloudState::Receiving,
            CloudState::Backoff,
            CloudState::Stopped,
        ] {
            assert_eq!(CloudState::from_tag(state.tag()), state);
        }
    }

    #[test]
    fn default_backoff_caps_at_128_seconds_with_8_attempts() {
        let schedule = CloudConfig::default_backoff();
        assert_eq!(schedule.max_attempts(), 8);
        assert!(schedule.delay_for(20).as_secs() <= 128 + 128 / 5 + 1);
    }

    #[test]
    fn build_request_carries_device_headers() {
        let config = CloudConfig {
            url: Url::parse("wss://relay.hypo.example/ws?session=abc").unwrap(),
            device_id: DeviceId::generate(),
            platform: "linux".into(),
            client_version: "1.0.0".into(),
            pinned_fingerprint_sha256: "0".repeat(64),
            ping_interval: Duration::from_secs(20),
            backoff: CloudConfig::default_backoff(),
            queue_capacity: crate::queue::DEFAULT_CAPACITY,
        };
        let request = build_request(&config).unwrap();
        assert_eq!(request.headers().get("X-Device-Platform").unwrap(), "linux");
        assert!(request.uri().to_string().contains("session=abc"));
    }

    #[tokio::test]
    async fn missed_pong_ends_the_session() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let (_sink, mut source) = ws.split();
            // Keep the socket open but never answer a ping with a pong.
            while source.next().await.is_some() {}
        });

        let (client_ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/")).await.unwrap();

        let config = CloudConfig {
            url: Url::parse("ws://relay.hypo.example/").unwrap(),
            device_id: DeviceId::generate(),
            platform: "linux".into(),
            client_version: "1.0.0".into(),
            pinned_fingerprint_sha256: "0".repeat(64),
            ping_interval: Duration::from_millis(30),
            backoff: CloudConfig::default_backoff(),
            queue_capacity: crate::queue::DEFAULT_CAPACITY,
        };
        let (_outbound, mut outbound_rx) = crate::queue::OutboundQueue::with_capacity(4);
        let (inbound_tx, _inbound_rx) = mpsc::unbounded_channel();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            run_session(client_ws, &config, &mut outbound_rx, &inbound_tx),
        )
        .await;
        assert!(result.is_ok(), "run_session must return once pongs stop arriving, not hang forever");
    }
}

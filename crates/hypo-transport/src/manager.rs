use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use hypo_core::errors::TransportError;
use hypo_core::ids::DeviceId;
use hypo_core::network::{SyncEnvelope, TransportKind};

use crate::cloud::{CloudClient, CloudConfig};
use crate::lan::{LanConfig, LanConnection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerReachability {
    Unknown,
    Reachable,
    Unreachable,
}

/// Which branch(es) of a dual-dispatch send actually enqueued the envelope
/// (§4.8). `hypo-sync` folds this into its `lan_only`/`cloud_only`/`both`
/// dual-send outcome counters (§4.11, C11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    pub lan_ok: bool,
    pub cloud_ok: bool,
}

const SEND_TIMEOUT: Duration = Duration::from_secs(3);

/// Owns every live connection plus the bookkeeping needed to pick the right
/// transport for a peer (§4.8). Never holds its internal locks across an
/// `.await` — each lock scope is taken, read or mutated, and dropped before
/// any network call starts.
pub struct TransportManager {
    cloud: Arc<Mutex<Option<CloudClient>>>,
    lan: Arc<Mutex<HashMap<DeviceId, LanConnection>>>,
    last_successful: Arc<Mutex<HashMap<DeviceId, TransportKind>>>,
    reachability: Arc<Mutex<HashMap<DeviceId, PeerReachability>>>,
}

impl Default for TransportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportManager {
    pub fn new() -> Self {
        Self {
            cloud: Arc::new(Mutex::new(None)),
            lan: Arc::new(Mutex::new(HashMap::new())),
            last_successful: Arc::new(Mutex::new(HashMap::new())),
            reachability: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Idempotent: replaces any existing cloud connection.
    pub fn start_cloud(&self, config: CloudConfig) -> mpsc::UnboundedReceiver<SyncEnvelope> {
        let (client, rx) = CloudClient::connect(config);
        if let Some(old) = self.cloud.lock().unwrap().replace(client) {
            old.stop();
        }
        rx
    }

    /// Idempotent per peer: replaces any existing LAN connection to that peer.
    pub fn connect_lan(
        &self,
        peer_id: DeviceId,
        url: Url,
        config: LanConfig,
    ) -> mpsc::UnboundedReceiver<SyncEnvelope> {
        let (connection, rx) = LanConnection::connect(peer_id.clone(), url, config);
        if let Some(old) = self.lan.lock().unwrap().insert(peer_id, connection) {
            old.stop();
        }
        rx
    }

    /// Stops every connection. Safe to call more than once.
    pub fn stop(&self) {
        if let Some(cloud) = self.cloud.lock().unwrap().take() {
            cloud.stop();
        }
        for (_, connection) in self.lan.lock().unwrap().drain() {
            connection.stop();
        }
    }

    pub fn mark_connected(&self, device_id: DeviceId, transport: TransportKind) {
        self.last_successful.lock().unwrap().insert(device_id.clone(), transport);
        self.reachability.lock().unwrap().insert(device_id, PeerReachability::Reachable);
    }

    pub fn forget(&self, device_id: &DeviceId) {
        if let Some(connection) = self.lan.lock().unwrap().remove(device_id) {
            connection.stop();
        }
        self.last_successful.lock().unwrap().remove(device_id);
        self.reachability.lock().unwrap().remove(device_id);
    }

    pub fn last_successful_transport(&self, device_id: &DeviceId) -> Option<TransportKind> {
        self.last_successful.lock().unwrap().get(device_id).copied()
    }

    pub fn peers(&self) -> Vec<DeviceId> {
        self.lan.lock().unwrap().keys().cloned().collect()
    }

    /// Dual-dispatch send (§4.8): both transports are tried concurrently;
    /// the LAN branch is capped at [`SEND_TIMEOUT`] so a dead local peer
    /// can't stall delivery to a reachable cloud path. Success is recorded
    /// against whichever branch actually enqueued the envelope; the
    /// returned [`SendOutcome`] reports both branches so callers can tell
    /// a single-path delivery from a redundant one.
    pub async fn send(&self, target: &DeviceId, envelope: SyncEnvelope) -> Result<SendOutcome, TransportError> {
        let lan_connection_present = self.lan.lock().unwrap().get(target).is_some();
        let cloud_present = self.cloud.lock().unwrap().is_some();

        if !lan_connection_present && !cloud_present {
            return Err(TransportError::NotConnected);
        }

        let lan_envelope = envelope.clone();
        let lan = self.lan.clone();
        let target_for_lan = target.clone();
        let lan_attempt = async move {
            let enqueued = lan.lock().unwrap().get(&target_for_lan).map(|c| c.send(lan_envelope));
            match enqueued {
                Some(true) => Ok(TransportKind::Lan),
                _ => Err(TransportError::NotConnected),
            }
        };

        let cloud = self.cloud.clone();
        let cloud_attempt = async move {
            let enqueued = cloud.lock().unwrap().as_ref().map(|c| c.send(envelope));
            match enqueued {
                Some(true) => Ok(TransportKind::Cloud),
                _ => Err(TransportError::NotConnected),
            }
        };

        let lan_result = tokio::time::timeout(SEND_TIMEOUT, lan_attempt).await;
        let cloud_result = cloud_attempt.await;

        let lan_ok = matches!(lan_result, Ok(Ok(TransportKind::Lan)));
        let cloud_ok = matches!(cloud_result, Ok(TransportKind::Cloud));

        // Mark cloud first so LAN (the preferred path when both succeed)
        // wins the `last_successful_transport` record.
        if cloud_ok {
            self.mark_connected(target.clone(), TransportKind::Cloud);
        }
        if lan_ok {
            self.mark_connected(target.clone(), TransportKind::Lan);
        }

        if lan_ok || cloud_ok {
            Ok(SendOutcome { lan_ok, cloud_ok })
        } else {
            warn!(peer = %target, "dual-dispatch send failed on both transports");
            Err(TransportError::SendTimeout)
        }
    }

    /// Best-effort reachability check, not a delivery guarantee: a TCP
    /// connect to the peer's LAN address, or an HTTP GET against the
    /// relay's `/health` endpoint (§4.8).
    pub async fn probe(&self, lan_addr: Option<SocketAddr>, cloud_health_url: Option<Url>) -> PeerReachability {
        if let Some(addr) = lan_addr {
            if tokio::time::timeout(Duration::from_secs(2), TcpStream::connect(addr)).await.is_ok_and(|r| r.is_ok()) {
                return PeerReachability::Reachable;
            }
        }

        if let Some(url) = cloud_health_url {
            let client = reqwest::Client::new();
            match tokio::time::timeout(Duration::from_secs(3), client.get(url).send()).await {
                Ok(Ok(response)) if response.status().is_success() => return PeerReachability::Reachable,
                _ => {}
            }
        }

        debug!("probe found no reachable transport");
        PeerReachability::Unreachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_with_no_transports_is_not_connected() {
        let manager = TransportManager::new();
        let envelope = sample_envelope();
        let result = manager.send(&DeviceId::generate(), envelope).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[test]
    fn mark_connected_then_forget_clears_bookkeeping() {
        let manager = TransportManager::new();
        let id = DeviceId::generate();
        manager.mark_connected(id.clone(), TransportKind::Lan);
        assert_eq!(manager.last_successful_transport(&id), Some(TransportKind::Lan));
        manager.forget(&id);
        assert_eq!(manager.last_successful_transport(&id), None);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let manager = TransportManager::new();
        manager.stop();
        manager.stop();
    }

    fn sample_envelope() -> SyncEnvelope {
        use hypo_core::ids::EnvelopeId;
        use hypo_core::network::{EncryptionMetadata, EnvelopePayload, MessageType};
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
}

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use hypo_core::device::Platform;
use hypo_core::ids::DeviceId;
use hypo_core::network::{DiscoveredPeer, DiscoveryEvent};

const SERVICE_TYPE: &str = "_hypo._tcp.local.";
const PRUNE_INTERVAL: Duration = Duration::from_secs(30);

/// Browses for `_hypo._tcp.` peers and turns raw mDNS resolution events into
/// [`DiscoveryEvent`]s, deduplicating repeated/flapping advertisements and
/// pruning entries that go stale (§4.4).
pub struct PeerBrowser {
    daemon: ServiceDaemon,
    peers: HashMap<DeviceId, DiscoveredPeer>,
}

impl PeerBrowser {
    pub fn new(daemon: ServiceDaemon) -> Self {
        Self { daemon, peers: HashMap::new() }
    }

    /// Spawn the browse loop plus the staleness-pruning loop, returning a
    /// channel the caller reads [`DiscoveryEvent`]s from.
    pub fn start(mut self) -> Result<mpsc::UnboundedReceiver<DiscoveryEvent>, mdns_sd::Error> {
        let receiver = self.daemon.browse(SERVICE_TYPE)?;
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.prune_stale(&tx);
                    }
                    event = receiver.recv_async() => {
                        match event {
                            Ok(event) => self.handle_event(event, &tx),
                            Err(_) => break,
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    fn handle_event(&mut self, event: ServiceEvent, tx: &mpsc::UnboundedSender<DiscoveryEvent>) {
        match event {
            ServiceEvent::ServiceResolved(info) => {
                let Some(peer) = peer_from_service_info(&info) else {
                    warn!(fullname = %info.get_fullname(), "resolved mDNS service missing required TXT keys");
                    return;
                };
                let event = match self.peers.insert(peer.device_id.clone(), peer.clone()) {
                    Some(_) => DiscoveryEvent::Updated(peer),
                    None => DiscoveryEvent::Added(peer),
                };
                let _ = tx.send(event);
            }
            ServiceEvent::ServiceRemoved(_ty, fullname) => {
                if let Some(id) = self.device_id_for_fullname(&fullname) {
                    self.peers.remove(&id);
                    let _ = tx.send(DiscoveryEvent::Removed(id));
                }
            }
            other => debug!(?other, "unhandled mDNS service event"),
        }
    }

    fn device_id_for_fullname(&self, fullname: &str) -> Option<DeviceId> {
        self.peers
            .values()
            .find(|p| p.service_name == fullname)
            .map(|p| p.device_id.clone())
    }

    fn prune_stale(&mut self, tx: &mpsc::UnboundedSender<DiscoveryEvent>) {
        let now = Utc::now();
        let stale: Vec<DeviceId> = self
            .peers
            .values()
            .filter(|p| p.is_stale(now))
            .map(|p| p.device_id.clone())
            .collect();
        for id in stale {
            self.peers.remove(&id);
            let _ = tx.send(DiscoveryEvent::Removed(id));
        }
    }
}

fn peer_from_service_info(info: &mdns_sd::ServiceInfo) -> Option<DiscoveredPeer> {
    let props = info.get_properties();
    let get = |key: &str| props.get_property_val_str(key).map(|v| v.to_string());

    let device_id = DeviceId::parse(&get("device_id")?)?;
    let fingerprint_sha256 = get("fingerprint_sha256")?;
    let kx_pub_b64 = get("pub_key")?;
    let signing_pub_b64 = get("signing_pub_key")?;
    let bundle_signature_b64 = get("bundle_sig")?;
    let issued_at_unix: i64 = get("issued_at")?.parse().ok()?;
    let issued_at = chrono::DateTime::from_timestamp(issued_at_unix, 0)?;
    let protocol_version = get("version").unwrap_or_else(|| "1".to_string());
    let platform = get("platform")
        .and_then(|p| Platform::from_str(&p).ok())
        .unwrap_or(Platform::Unknown);

    let host = info.get_addresses().iter().next().map(|a| a.to_string())?;
    let port = info.get_port();

    Some(DiscoveredPeer {
        device_id,
        service_name: info.get_fullname().to_string(),
        host,
        port,
        fingerprint_sha256,
        kx_pub_b64,
        signing_pub_b64,
        issued_at,
        bundle_signature_b64,
        platform,
        protocol_version,
        last_seen: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn sample_peer(id: DeviceId, last_seen: chrono::DateTime<Utc>) -> DiscoveredPeer {
        DiscoveredPeer {
            device_id: id,
            service_name: "hypo-abc._hypo._tcp.local.".into(),
            host: "192.168.1.10".into(),
            port: 9000,
            fingerprint_sha256: "abc123".into(),
            kx_pub_b64: String::new(),
            signing_pub_b64: String::new(),
            issued_at: last_seen,
            bundle_signature_b64: String::new(),
            platform: Platform::Linux,
            protocol_version: "1".into(),
            last_seen,
        }
    }

    #[test]
    fn prune_stale_removes_only_expired_peers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut browser = PeerBrowser {
            daemon: ServiceDaemon::new().expect("daemon"),
            peers: HashMap::new(),
        };

        let fresh_id = DeviceId::generate();
        let stale_id = DeviceId::generate();
        browser.peers.insert(fresh_id.clone(), sample_peer(fresh_id.clone(), Utc::now()));
        let stale_seen = Utc::now() - ChronoDuration::seconds(DiscoveredPeer::STALE_AFTER_SECS + 10);
        browser.peers.insert(stale_id.clone(), sample_peer(stale_id.clone(), stale_seen));

        browser.prune_stale(&tx);

        assert!(browser.peers.contains_key(&fresh_id));
        assert!(!browser.peers.contains_key(&stale_id));
        match rx.try_recv().unwrap() {
            DiscoveryEvent::Removed(id) => assert_eq!(id, stale_id),
            _ => panic!("expected Removed"),
        }
    }
}

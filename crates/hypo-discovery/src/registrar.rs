use std::collections::HashMap;
use std::net::Ipv4Addr;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use thiserror::Error;
use tracing::{info, warn};

use crate::backoff::BackoffSchedule;
use crate::state::DiscoveryState;

const SERVICE_TYPE: &str = "_hypo._tcp.local.";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("mDNS daemon error: {0}")]
    Daemon(String),
    #[error("no physical LAN address available to advertise")]
    NoLanAddress,
}

/// Everything advertised in the TXT record (§6.3). `issued_at_unix` and
/// `bundle_signature_b64` are the freshness timestamp and Ed25519
/// signature over `(pub_key_b64, signing_pub_key_b64, issued_at_unix)`
/// that let a receiving peer confirm the bundle wasn't altered or replayed
/// before pairing against it (§4.7 step 1) — the caller is responsible for
/// producing the signature with the same signing key it advertises here.
#[derive(Debug, Clone)]
pub struct AdvertiseInfo {
    pub device_id: String,
    pub pub_key_b64: String,
    pub signing_pub_key_b64: String,
    pub fingerprint_sha256: String,
    pub version: String,
    pub service_name: String,
    pub port: u16,
    pub issued_at_unix: i64,
    pub bundle_signature_b64: String,
}

impl AdvertiseInfo {
    fn txt_properties(&self) -> HashMap<String, String> {
        let mut props = HashMap::new();
        props.insert("device_id".into(), self.device_id.clone());
        props.insert("pub_key".into(), self.pub_key_b64.clone());
        props.insert("signing_pub_key".into(), self.signing_pub_key_b64.clone());
        props.insert("fingerprint_sha256".into(), self.fingerprint_sha256.clone());
        props.insert("version".into(), self.version.clone());
        props.insert("protocols".into(), "ws+tls".into());
        props.insert("issued_at".into(), self.issued_at_unix.to_string());
        props.insert("bundle_sig".into(), self.bundle_signature_b64.clone());
        props
    }
}

/// Owns the advertisement half of discovery: registers `_hypo._tcp.` with
/// exponential-backoff retry, and re-registers the same service name when
/// the local network changes (§4.4).
pub struct Registrar {
    daemon: ServiceDaemon,
    state: DiscoveryState,
    fullname: Option<String>,
}

impl Registrar {
    pub fn new() -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::Daemon(e.to_string()))?;
        Ok(Self { daemon, state: DiscoveryState::Idle, fullname: None })
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Register the service, retrying with [`BackoffSchedule::registration`]
    /// on failure. Returns once registered or once attempts are exhausted.
    pub async fn register(&mut self, info: &AdvertiseInfo, ip: Ipv4Addr) -> Result<(), DiscoveryError> {
        if !self.state.can_start() {
            return Ok(());
        }
        self.state = DiscoveryState::Registering;

        let schedule = BackoffSchedule::registration();
        let mut last_err = None;
        for attempt in 0..schedule.max_attempts() {
            match self.try_register(info, ip) {
                Ok(()) => {
                    self.state = DiscoveryState::Advertised;
                    info!(service = %info.service_name, "mDNS service advertised");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "mDNS registration attempt failed");
                    last_err = Some(e);
                    tokio::time::sleep(schedule.delay_for(attempt)).await;
                }
            }
        }
        self.state = DiscoveryState::Idle;
        Err(last_err.unwrap_or(DiscoveryError::Daemon("registration exhausted retries".into())))
    }

    fn try_register(&mut self, info: &AdvertiseInfo, ip: Ipv4Addr) -> Result<(), DiscoveryError> {
        let host_name = format!("{}.local.", info.service_name);
        let service = ServiceInfo::new(
            SERVICE_TYPE,
            &info.service_name,
            &host_name,
            ip,
            info.port,
            info.txt_properties(),
        )
        .map_err(|e| DiscoveryError::Daemon(e.to_string()))?;
        let fullname = service.get_fullname().to_string();
        self.daemon.register(service).map_err(|e| DiscoveryError::Daemon(e.to_string()))?;
        self.fullname = Some(fullname);
        Ok(())
    }

    /// Tear down and re-register under the same service name (§4.4: "on any
    /// local-network change the current registration is torn down and
    /// re-registered... preserving the same configured service name").
    pub async fn reregister(&mut self, info: &AdvertiseInfo, ip: Ipv4Addr) -> Result<(), DiscoveryError> {
        self.stop();
        self.state = DiscoveryState::Idle;
        self.register(info, ip).await
    }

    pub fn stop(&mut self) {
        if let Some(fullname) = self.fullname.take() {
            let _ = self.daemon.unregister(&fullname);
        }
        self.state = DiscoveryState::Stopped;
    }
}

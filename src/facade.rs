use std::sync::Arc;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hypo_core::clipboard::{ClipboardContent, ClipboardEntry, TransportOrigin};
use hypo_core::device::{PairedDevice, Platform};
use hypo_core::network::{DiscoveredPeer, DiscoveryEvent};
use hypo_core::ports::{ClipboardAdapterPort, KeyStorePort, PairedDeviceRepositoryPort, PreferencesPort};
use hypo_discovery::{AdvertiseInfo, Registrar};
use hypo_infra::{FilePairedDeviceRepository, FilePreferencesRepository, HypoConfig};
use hypo_keystore::PlatformKeyStore;
use hypo_sync::{IncomingHandler, Metrics, SyncCoordinator};
use hypo_transport::{drain_inbound, LanServer, TransportManager};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use url::Url;

use crate::identity::LocalIdentity;
use crate::pairing::PairingCoordinator;

/// How often the local clipboard is polled for changes (§4.1). The host's
/// [`ClipboardAdapterPort`] is a pull interface, not a push one, so this is
/// the only place the sync engine learns about a local copy.
const CLIPBOARD_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

/// The assembled sync engine: one instance per running install. Everything
/// the host application needs to drive — starting the engine, initiating a
/// pairing, reading metrics — goes through this handle.
pub struct HypoCore {
    pub identity: LocalIdentity,
    device_name: String,
    platform: Platform,
    config: HypoConfig,
    key_store: Arc<PlatformKeyStore>,
    paired_devices: Arc<dyn PairedDeviceRepositoryPort>,
    preferences: Arc<FilePreferencesRepository>,
    transport: Arc<TransportManager>,
    coordinator: Arc<SyncCoordinator>,
    incoming: Arc<IncomingHandler>,
    metrics: Arc<Metrics>,
    pairing: Arc<PairingCoordinator>,
    clipboard: Arc<dyn ClipboardAdapterPort>,
    is_running: Arc<RwLock<bool>>,
    lan_server: Mutex<Option<LanServer>>,
    registrar: Mutex<Option<Registrar>>,
}

impl HypoCore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        identity: LocalIdentity,
        device_name: String,
        platform: Platform,
        config: HypoConfig,
        key_store: Arc<PlatformKeyStore>,
        paired_devices: Arc<dyn PairedDeviceRepositoryPort>,
        preferences: Arc<FilePreferencesRepository>,
        transport: Arc<TransportManager>,
        coordinator: Arc<SyncCoordinator>,
        incoming: Arc<IncomingHandler>,
        metrics: Arc<Metrics>,
        pairing: Arc<PairingCoordinator>,
        clipboard: Arc<dyn ClipboardAdapterPort>,
    ) -> Self {
        Self {
            identity,
            device_name,
            platform,
            config,
            key_store,
            paired_devices,
            preferences,
            transport,
            coordinator,
            incoming,
            metrics,
            pairing,
            clipboard,
            is_running: Arc::new(RwLock::new(false)),
            lan_server: Mutex::new(None),
            registrar: Mutex::new(None),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn pairing(&self) -> &PairingCoordinator {
        &self.pairing
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub async fn paired_devices(&self) -> Result<Vec<PairedDevice>> {
        Ok(self.paired_devices.list().await?)
    }

    pub async fn preferences(&self) -> Result<hypo_core::preferences::Preferences> {
        Ok(self.preferences.load().await?)
    }

    pub async fn set_preferences(&self, preferences: &hypo_core::preferences::Preferences) -> Result<()> {
        Ok(self.preferences.save(preferences).await?)
    }

    /// Remove a paired device and its key (§4.7 unpair path): both
    /// namespaces are dropped together so a stale key never outlives its
    /// paired-device record.
    pub async fn unpair(&self, device_id: &hypo_core::ids::DeviceId) -> Result<()> {
        self.key_store.delete(device_id).await?;
        self.paired_devices.remove(device_id).await?;
        self.transport.forget(device_id);
        Ok(())
    }

    /// Start the LAN/cloud receive loops, the discovery browse loop, and the
    /// clipboard-capture poll loop. Returns once everything is spawned;
    /// the loops themselves run for the life of the process until [`stop`](Self::stop).
    pub async fn start(&self) -> Result<()> {
        {
            let mut running = self.is_running.write().await;
            if *running {
                anyhow::bail!("already running");
            }
            *running = true;
        }

        self.start_cloud_connection();
        self.start_lan_server().await?;
        self.start_discovery().await?;
        self.start_clipboard_poll();

        info!(device_id = %self.identity.device_id.as_str(), "hypo sync engine started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut running = self.is_running.write().await;
        if !*running {
            anyhow::bail!("not running");
        }
        *running = false;
        self.transport.stop();
        if let Some(server) = self.lan_server.lock().await.take() {
            server.stop();
        }
        if let Some(mut registrar) = self.registrar.lock().await.take() {
            registrar.stop();
        }
        Ok(())
    }

    /// Bind the LAN WebSocket listener (§4.5) and advertise it over mDNS
    /// (§4.4). Every frame the listener accepts is handed to
    /// [`IncomingHandler`] tagged [`TransportOrigin::Lan`], the same as a
    /// frame received on a connection this device dialed out.
    async fn start_lan_server(&self) -> Result<()> {
        let bind_addr: std::net::SocketAddr = self
            .config
            .lan_bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid lan_bind_addr {:?}: {e}", self.config.lan_bind_addr))?;

        let (server, rx) = LanServer::bind(bind_addr).await?;
        let port = server.local_addr().port();

        let incoming = self.incoming.clone();
        tokio::spawn(async move {
            drain_inbound(rx, |envelope, origin| {
                let incoming = incoming.clone();
                async move { incoming.handle(envelope, origin).await }
            })
            .await;
        });

        *self.lan_server.lock().await = Some(server);

        match hypo_discovery::get_physical_lan_ip() {
            Some(ip) => {
                let kx_pub = self.identity.kx.public_bytes();
                let signing_pub = self.identity.signing.verifying_bytes();
                let issued_at = chrono::Utc::now();
                let bundle_sig = self
                    .identity
                    .signing
                    .sign(&hypo_pairing::bundle_message(&kx_pub, &signing_pub, issued_at.timestamp()));

                let info = AdvertiseInfo {
                    device_id: self.identity.device_id.as_str().to_string(),
                    pub_key_b64: BASE64.encode(kx_pub),
                    signing_pub_key_b64: BASE64.encode(signing_pub),
                    fingerprint_sha256: self.identity.fingerprint(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    service_name: self.config.service_name.clone(),
                    port,
                    issued_at_unix: issued_at.timestamp(),
                    bundle_signature_b64: BASE64.encode(bundle_sig),
                };
                match Registrar::new() {
                    Ok(mut registrar) => {
                        if let Err(err) = registrar.register(&info, ip).await {
                            warn!(error = %err, "mDNS advertisement failed, LAN peers will not discover this device");
                        }
                        *self.registrar.lock().await = Some(registrar);
                    }
                    Err(err) => warn!(error = %err, "mDNS daemon init failed, LAN advertisement disabled"),
                }
            }
            None => warn!("no physical LAN address available, LAN advertisement disabled"),
        }

        Ok(())
    }

    fn start_cloud_connection(&self) {
        let url = match Url::parse(&self.config.relay_url) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "relay url is not parseable, cloud transport disabled");
                return;
            }
        };

        let cloud_config = hypo_transport::CloudConfig {
            url,
            device_id: self.identity.device_id.clone(),
            platform: self.platform.to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            pinned_fingerprint_sha256: self.config.pinned_cert_fingerprint.clone().unwrap_or_default(),
            ping_interval: std::time::Duration::from_secs(30),
            backoff: hypo_transport::CloudConfig::default_backoff(),
            queue_capacity: 256,
        };

        let mut rx = self.transport.start_cloud(cloud_config);
        let incoming = self.incoming.clone();
        let is_running = self.is_running.clone();
        tokio::spawn(async move {
            while *is_running.read().await {
                match rx.recv().await {
                    Some(envelope) => incoming.handle(envelope, TransportOrigin::Cloud).await,
                    None => break,
                }
            }
        });
    }

    async fn start_discovery(&self) -> Result<()> {
        let daemon = mdns_sd::ServiceDaemon::new().map_err(|e| anyhow::anyhow!("mDNS daemon init failed: {e}"))?;
        let browser = hypo_discovery::PeerBrowser::new(daemon);
        let mut events = browser.start().map_err(|e| anyhow::anyhow!("mDNS browse failed: {e}"))?;

        let transport = self.transport.clone();
        let paired_devices = self.paired_devices.clone();
        let incoming = self.incoming.clone();
        let is_running = self.is_running.clone();

        tokio::spawn(async move {
            while *is_running.read().await {
                match events.recv().await {
                    Some(DiscoveryEvent::Added(peer)) | Some(DiscoveryEvent::Updated(peer)) => {
                        connect_if_paired(&transport, paired_devices.as_ref(), &peer, &incoming).await;
                    }
                    Some(DiscoveryEvent::Removed(device_id)) => {
                        transport.forget(&device_id);
                    }
                    None => break,
                }
            }
        });

        Ok(())
    }

    fn start_clipboard_poll(&self) {
        let clipboard = self.clipboard.clone();
        let coordinator = self.coordinator.clone();
        let device_id = self.identity.device_id.clone();
        let device_name = self.device_name.clone();
        let platform = self.platform;
        let is_running = self.is_running.clone();

        tokio::spawn(async move {
            let mut last: Option<ClipboardContent> = None;
            let mut interval = tokio::time::interval(CLIPBOARD_POLL_INTERVAL);
            while *is_running.read().await {
                interval.tick().await;
                match clipboard.current().await {
                    Ok(Some(content)) if last.as_ref() != Some(&content) => {
                        last = Some(content.clone());
                        let entry = ClipboardEntry::new(
                            device_id.clone(),
                            platform,
                            device_name.clone(),
                            content,
                            TransportOrigin::Local,
                            false,
                        );
                        if let Err(err) = coordinator.handle_entry(entry, false).await {
                            error!(error = %err, "failed to process locally captured clipboard entry");
                        }
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "failed to read local clipboard"),
                }
            }
        });
    }
}

/// Dial a newly (re)discovered peer's LAN listener if it's already paired
/// (§4.5/§4.8). The returned receiver carries every frame the peer sends
/// back over this connection — including its own outbound clipboard
/// entries — so it's forwarded to [`IncomingHandler`] exactly like a frame
/// this device's own [`LanServer`] accepted.
async fn connect_if_paired(
    transport: &TransportManager,
    paired_devices: &dyn PairedDeviceRepositoryPort,
    peer: &DiscoveredPeer,
    incoming: &Arc<IncomingHandler>,
) {
    match paired_devices.get(&peer.device_id).await {
        Ok(Some(_)) => {
            let Ok(url) = Url::parse(&format!("ws://{}:{}/sync", peer.host, peer.port)) else {
                warn!(peer = %peer.device_id, "discovered peer address is not a valid url");
                return;
            };
            let rx = transport.connect_lan(peer.device_id.clone(), url, hypo_transport::LanConfig::default());
            let incoming = incoming.clone();
            tokio::spawn(async move {
                let mut rx = rx;
                while let Some(envelope) = rx.recv().await {
                    incoming.handle(envelope, TransportOrigin::Lan).await;
                }
            });
        }
        Ok(None) => {}
        Err(err) => warn!(peer = %peer.device_id, error = %err, "paired-device lookup failed during discovery"),
    }
}


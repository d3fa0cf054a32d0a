use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use hypo_core::device::Platform;
use hypo_core::ports::{ClipboardAdapterPort, HistoryStorePort, NotifierPort};
use hypo_infra::{FilePairedDeviceRepository, FilePreferencesRepository, HypoConfig};
use hypo_keystore::PlatformKeyStore;
use hypo_sync::{IncomingHandler, Metrics, SyncCoordinator};
use hypo_transport::TransportManager;

use crate::facade::HypoCore;
use crate::identity::{default_config_dir, LocalIdentity};
use crate::pairing::{local_platform, PairingCoordinator};

/// Assembles a [`HypoCore`] from the host application's ports plus an
/// on-disk state directory. The host supplies the clipboard, notifier, and
/// history store; everything else (identity, keys, paired-device table,
/// preferences, transports, the sync pipeline) is wired internally.
pub struct HypoCoreBuilder {
    state_dir: Option<PathBuf>,
    device_name: Option<String>,
    platform: Option<Platform>,
    clipboard: Option<Arc<dyn ClipboardAdapterPort>>,
    notifier: Option<Arc<dyn NotifierPort>>,
    history: Option<Arc<dyn HistoryStorePort>>,
}

impl HypoCoreBuilder {
    pub fn new() -> Self {
        Self { state_dir: None, device_name: None, platform: None, clipboard: None, notifier: None, history: None }
    }

    pub fn set_state_dir(mut self, state_dir: PathBuf) -> Self {
        self.state_dir = Some(state_dir);
        self
    }

    pub fn set_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = Some(device_name.into());
        self
    }

    pub fn set_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn set_clipboard_adapter(mut self, clipboard: Arc<dyn ClipboardAdapterPort>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn set_notifier(mut self, notifier: Arc<dyn NotifierPort>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn set_history_store(mut self, history: Arc<dyn HistoryStorePort>) -> Self {
        self.history = Some(history);
        self
    }

    pub async fn build(self) -> Result<HypoCore> {
        let state_dir = self.state_dir.unwrap_or_else(default_config_dir);
        let clipboard = self.clipboard.ok_or_else(|| anyhow::anyhow!("no clipboard adapter set"))?;
        let notifier = self.notifier.ok_or_else(|| anyhow::anyhow!("no notifier set"))?;
        let history = self.history.ok_or_else(|| anyhow::anyhow!("no history store set"))?;

        tokio::fs::create_dir_all(&state_dir).await?;

        let identity = LocalIdentity::load_or_generate(&state_dir).await?;
        let device_name = self.device_name.unwrap_or_else(|| gethostname::gethostname().to_string_lossy().into_owned());
        let platform = self.platform.unwrap_or_else(local_platform);

        let config = HypoConfig::load(state_dir.join("config.toml"))?;

        let key_store = Arc::new(PlatformKeyStore::detect(state_dir.join("keys"))?);
        let paired_devices: Arc<dyn hypo_core::ports::PairedDeviceRepositoryPort> =
            Arc::new(FilePairedDeviceRepository::new(state_dir.join("paired_devices.json")));
        let preferences = Arc::new(FilePreferencesRepository::new(state_dir.join("preferences.json")));

        let transport = Arc::new(TransportManager::new());
        let metrics = Arc::new(Metrics::new());

        let coordinator = Arc::new(SyncCoordinator::new(
            history,
            key_store.clone() as Arc<dyn hypo_core::ports::KeyStorePort>,
            paired_devices.clone(),
            preferences.clone() as Arc<dyn hypo_core::ports::PreferencesPort>,
            notifier,
            transport.clone(),
            metrics.clone(),
            identity.device_id.clone(),
        ));

        let incoming = Arc::new(IncomingHandler::new(
            key_store.clone() as Arc<dyn hypo_core::ports::KeyStorePort>,
            paired_devices.clone(),
            coordinator.clone(),
            identity.device_id.clone(),
        ));

        let pairing = Arc::new(PairingCoordinator::new());

        Ok(HypoCore::new(
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
        ))
    }
}

impl Default for HypoCoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

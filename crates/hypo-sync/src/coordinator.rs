use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info_span, warn, Instrument};

use hypo_codec::PipelineError;
use hypo_core::clipboard::{ClipboardEntry, TransportOrigin};
use hypo_core::errors::{CryptoError, StateError, TransportError};
use hypo_core::ids::{DeviceId, EnvelopeId};
use hypo_core::ports::{HistoryStorePort, KeyStorePort, NotifierPort, PairedDeviceRepositoryPort, PreferencesPort};
use hypo_transport::TransportManager;

use crate::echo_window::EchoWindow;
use crate::metrics::{Metrics, SendOutcomeKind};

/// Failures from a single step of the outbound pipeline. A per-target
/// failure here never cancels delivery to other targets (§4.9); only
/// `handle_entry`'s own persistence/bookkeeping steps propagate one.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Cap on the pending-round-trip table so a peer that never echoes back
/// can't grow it unbounded; entries older than this are pruned lazily.
const ROUND_TRIP_TTL: Duration = Duration::from_secs(10 * 60);
const MAX_PENDING_ROUND_TRIPS: usize = 256;

/// Owns the outbound pipeline (§4.9): persistence, target-set computation,
/// per-target dispatch, echo suppression, and the pending-round-trip
/// table used to time self-echoes. Per the ownership invariant in §3/§5
/// ("dedup window in SyncCoordinator: owned by the pipeline task; no
/// external access"), `echo_window` and `pending_round_trips` are private
/// to this struct — nothing outside it ever reads or mutates them
/// directly.
pub struct SyncCoordinator {
    history: Arc<dyn HistoryStorePort>,
    key_store: Arc<dyn KeyStorePort>,
    paired_devices: Arc<dyn PairedDeviceRepositoryPort>,
    preferences: Arc<dyn PreferencesPort>,
    notifier: Arc<dyn NotifierPort>,
    transport: Arc<TransportManager>,
    metrics: Arc<Metrics>,
    local_device_id: DeviceId,
    echo_window: Mutex<EchoWindow>,
    pending_round_trips: Mutex<HashMap<EnvelopeId, Instant>>,
}

impl SyncCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        history: Arc<dyn HistoryStorePort>,
        key_store: Arc<dyn KeyStorePort>,
        paired_devices: Arc<dyn PairedDeviceRepositoryPort>,
        preferences: Arc<dyn PreferencesPort>,
        notifier: Arc<dyn NotifierPort>,
        transport: Arc<TransportManager>,
        metrics: Arc<Metrics>,
        local_device_id: DeviceId,
    ) -> Self {
        Self {
            history,
            key_store,
            paired_devices,
            preferences,
            notifier,
            transport,
            metrics,
            local_device_id,
            echo_window: Mutex::new(EchoWindow::bounded()),
            pending_round_trips: Mutex::new(HashMap::new()),
        }
    }

    /// Entry point for both pipeline inputs (§4.9): `skip_broadcast` is
    /// `false` for a local capture and `true` for an entry
    /// `IncomingHandler` already received from a peer.
    pub async fn handle_entry(&self, entry: ClipboardEntry, skip_broadcast: bool) -> Result<(), SyncError> {
        let span = info_span!("sync_coordinator.handle_entry", entry_id = %entry.id, skip_broadcast);
        self.handle_entry_inner(entry, skip_broadcast).instrument(span).await
    }

    async fn handle_entry_inner(&self, entry: ClipboardEntry, skip_broadcast: bool) -> Result<(), SyncError> {
        let signature = entry.dedup_key();
        if self.echo_window.lock().unwrap().is_recent_echo(signature) {
            debug!(origin = %entry.origin_device_id, "dropping entry: signature seen within the echo window");
            return Ok(());
        }

        let inserted = self.history.insert_if_new(entry.clone()).await?;
        if !inserted {
            debug!("entry already present in history store, not re-broadcasting");
            return Ok(());
        }

        if entry.transport_origin != TransportOrigin::Local {
            let authored_locally =
                self.history.contains_dedup_key(&self.local_device_id, &entry.content_hash()).await?;
            if authored_locally {
                debug!("suppressing notification: content was previously authored by this device");
            } else {
                self.notifier.show(&entry).await;
            }
        }

        if skip_broadcast {
            debug!("skip_broadcast set, not fanning out");
            return Ok(());
        }

        let targets = self.target_set().await?;
        if targets.is_empty() {
            debug!("no paired targets with a key on file, not fanning out");
            return Ok(());
        }

        for target in targets {
            if let Err(err) = self.send_to_target(&entry, &target).await {
                warn!(target = %target, error = %err, "delivery to target failed, continuing with remaining targets");
            }
        }

        Ok(())
    }

    /// Paired device ids excluding the local one, restricted to those with
    /// a key on file (§4.9 input (b): "paired device ids (KeyStore +
    /// discovery)"). Discovery's contribution — whether a target is
    /// actually reachable right now — is `TransportManager`'s concern; a
    /// per-target send failure here is independent and doesn't shrink the
    /// set for the next entry.
    async fn target_set(&self) -> Result<Vec<DeviceId>, SyncError> {
        let paired = self.paired_devices.list().await?;
        let mut targets = Vec::with_capacity(paired.len());
        for device in paired {
            if device.device_id == self.local_device_id {
                continue;
            }
            match self.key_store.load(&device.device_id).await {
                Ok(Some(_)) => targets.push(device.device_id),
                Ok(None) => {
                    debug!(peer = %device.device_id, "paired device has no key on file, excluding from target set")
                }
                Err(err) => {
                    warn!(peer = %device.device_id, error = %err, "key lookup failed, excluding from target set")
                }
            }
        }
        Ok(targets)
    }

    async fn send_to_target(&self, entry: &ClipboardEntry, target: &DeviceId) -> Result<(), SyncError> {
        let key = self.key_store.load(target).await?;
        // §8 scenario 6: plaintext_debug skips encryption for wire inspection,
        // never for lack of a key — `target_set` already excludes keyless peers.
        let plaintext_debug = self.preferences.load().await.map(|p| p.plaintext_debug).unwrap_or(false);
        let key_for_encode = if plaintext_debug { None } else { key.as_ref() };
        let envelope = hypo_codec::encode_envelope(&entry.content, &self.local_device_id, target, key_for_encode)?;

        self.record_pending_round_trip(envelope.id.clone());

        let outcome = self.transport.send(target, envelope).await;
        self.metrics.record_send_outcome(SendOutcomeKind::from(outcome.as_ref().ok().copied()));
        outcome.map(|_| ()).map_err(SyncError::from)
    }

    pub(crate) fn record_pending_round_trip(&self, envelope_id: EnvelopeId) {
        let mut table = self.pending_round_trips.lock().unwrap();
        let now = Instant::now();
        table.retain(|_, sent_at| now.duration_since(*sent_at) < ROUND_TRIP_TTL);
        if table.len() < MAX_PENDING_ROUND_TRIPS {
            table.insert(envelope_id, now);
        }
    }

    /// Called by [`crate::IncomingHandler`] for every decoded envelope,
    /// before the loop-suppression check: a frame whose id matches one
    /// this device sent is the self-echo §4.10 measures round-trip time
    /// from (relay or LAN loopback reflecting a send back to its sender).
    pub(crate) fn observe_round_trip(&self, envelope_id: &EnvelopeId) {
        let sent_at = self.pending_round_trips.lock().unwrap().remove(envelope_id);
        if let Some(sent_at) = sent_at {
            self.metrics.record_round_trip_duration(sent_at.elapsed());
        }
    }

    pub fn local_device_id(&self) -> &DeviceId {
        &self.local_device_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use hypo_core::clipboard::ClipboardContent;
    use hypo_core::device::{PairedDevice, Platform};
    use hypo_core::ids::{EntryId, PeerKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestHistory {
        inserted: Mutex<Vec<ClipboardEntry>>,
        already_present: bool,
        authored_locally: bool,
    }

    #[async_trait]
    impl HistoryStorePort for TestHistory {
        async fn insert_if_new(&self, entry: ClipboardEntry) -> Result<bool, StateError> {
            self.inserted.lock().unwrap().push(entry);
            Ok(!self.already_present)
        }

        async fn contains_dedup_key(&self, _origin: &DeviceId, _content_hash: &str) -> Result<bool, StateError> {
            Ok(self.authored_locally)
        }
    }

    struct TestKeyStore;

    #[async_trait]
    impl KeyStorePort for TestKeyStore {
        async fn store(&self, _device_id: &DeviceId, _key: PeerKey) -> Result<(), CryptoError> {
            Ok(())
        }
        async fn load(&self, _device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError> {
            Ok(Some(PeerKey::from_bytes([7u8; 32])))
        }
        async fn delete(&self, _device_id: &DeviceId) -> Result<(), CryptoError> {
            Ok(())
        }
        async fn list_ids(&self) -> Result<Vec<DeviceId>, CryptoError> {
            Ok(Vec::new())
        }
    }

    struct TestPairedDevices {
        devices: Vec<PairedDevice>,
    }

    #[async_trait]
    impl PairedDeviceRepositoryPort for TestPairedDevices {
        async fn upsert(&self, _device: PairedDevice) -> Result<(), StateError> {
            Ok(())
        }
        async fn get(&self, _device_id: &DeviceId) -> Result<Option<PairedDevice>, StateError> {
            Ok(None)
        }
        async fn list(&self) -> Result<Vec<PairedDevice>, StateError> {
            Ok(self.devices.clone())
        }
        async fn remove(&self, _device_id: &DeviceId) -> Result<(), StateError> {
            Ok(())
        }
    }

    struct TestPreferences;

    #[async_trait]
    impl PreferencesPort for TestPreferences {
        async fn load(&self) -> Result<hypo_core::preferences::Preferences, StateError> {
            Ok(hypo_core::preferences::Preferences::default())
        }
        async fn save(&self, _preferences: &hypo_core::preferences::Preferences) -> Result<(), StateError> {
            Ok(())
        }
    }

    struct RecordingPreferences {
        plaintext_debug: bool,
        load_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PreferencesPort for RecordingPreferences {
        async fn load(&self) -> Result<hypo_core::preferences::Preferences, StateError> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            Ok(hypo_core::preferences::Preferences { plaintext_debug: self.plaintext_debug, ..Default::default() })
        }
        async fn save(&self, _preferences: &hypo_core::preferences::Preferences) -> Result<(), StateError> {
            Ok(())
        }
    }

    struct TestNotifier {
        shown: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NotifierPort for TestNotifier {
        async fn show(&self, _entry: &ClipboardEntry) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn local_entry(local_id: &DeviceId) -> ClipboardEntry {
        ClipboardEntry::new(
            local_id.clone(),
            Platform::Linux,
            "this device",
            ClipboardContent::Text { text: "hello".into() },
            TransportOrigin::Local,
            false,
        )
    }

    fn coordinator(
        local_id: DeviceId,
        paired: Vec<PairedDevice>,
        already_present: bool,
        authored_locally: bool,
    ) -> (SyncCoordinator, Arc<AtomicUsize>) {
        let shown = Arc::new(AtomicUsize::new(0));
        let notifier = Arc::new(TestNotifier { shown: shown.clone() });
        let coordinator = SyncCoordinator::new(
            Arc::new(TestHistory { inserted: Mutex::new(Vec::new()), already_present, authored_locally }),
            Arc::new(TestKeyStore),
            Arc::new(TestPairedDevices { devices: paired }),
            Arc::new(TestPreferences),
            notifier,
            Arc::new(TransportManager::new()),
            Arc::new(Metrics::new()),
            local_id,
        );
        (coordinator, shown)
    }

    #[tokio::test]
    async fn local_capture_with_no_paired_devices_does_not_error() {
        let local_id = DeviceId::generate();
        let (coordinator, _) = coordinator(local_id.clone(), Vec::new(), false, false);
        let result = coordinator.handle_entry(local_entry(&local_id), false).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn skip_broadcast_stops_before_target_set_is_computed() {
        let local_id = DeviceId::generate();
        let peer = PairedDevice::new(DeviceId::generate(), "peer", Platform::MacOS);
        let (coordinator, _) = coordinator(local_id.clone(), vec![peer], false, false);

        let mut entry = local_entry(&local_id);
        entry.transport_origin = TransportOrigin::Lan;
        entry.origin_device_id = DeviceId::generate();

        let result = coordinator.handle_entry(entry, true).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn entry_already_in_history_is_not_reprocessed() {
        let local_id = DeviceId::generate();
        let (coordinator, _) = coordinator(local_id.clone(), Vec::new(), true, false);
        let result = coordinator.handle_entry(local_entry(&local_id), false).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn repeated_signature_within_echo_window_is_dropped() {
        let local_id = DeviceId::generate();
        let (coordinator, _) = coordinator(local_id.clone(), Vec::new(), false, false);
        let entry = local_entry(&local_id);

        coordinator.handle_entry(entry.clone(), false).await.unwrap();

        let mut repeat = entry.clone();
        repeat.id = EntryId::new();
        let result = coordinator.handle_entry(repeat, false).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn notification_is_suppressed_for_content_authored_locally() {
        let local_id = DeviceId::generate();
        let peer_id = DeviceId::generate();
        let (coordinator, shown) = coordinator(local_id.clone(), Vec::new(), false, true);

        let mut entry = ClipboardEntry::new(
            peer_id,
            Platform::Windows,
            "peer",
            ClipboardContent::Text { text: "from peer".into() },
            TransportOrigin::Lan,
            true,
        );
        entry.id = EntryId::new();

        coordinator.handle_entry(entry, true).await.unwrap();
        assert_eq!(shown.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatch_to_a_target_consults_plaintext_debug_preference() {
        let local_id = DeviceId::generate();
        let peer = PairedDevice::new(DeviceId::generate(), "peer", Platform::MacOS);
        let load_calls = Arc::new(AtomicUsize::new(0));

        let notifier = Arc::new(TestNotifier { shown: Arc::new(AtomicUsize::new(0)) });
        let coordinator = SyncCoordinator::new(
            Arc::new(TestHistory { inserted: Mutex::new(Vec::new()), already_present: false, authored_locally: false }),
            Arc::new(TestKeyStore),
            Arc::new(TestPairedDevices { devices: vec![peer] }),
            Arc::new(RecordingPreferences { plaintext_debug: true, load_calls: load_calls.clone() }),
            notifier,
            Arc::new(TransportManager::new()),
            Arc::new(Metrics::new()),
            local_id.clone(),
        );

        coordinator.handle_entry(local_entry(&local_id), false).await.unwrap();
        assert!(load_calls.load(Ordering::SeqCst) >= 1);
    }
}

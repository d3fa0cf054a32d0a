use std::sync::Arc;

use tracing::{debug, info_span, warn, Instrument};

use hypo_core::clipboard::{ClipboardEntry, TransportOrigin};
use hypo_core::device::Platform;
use hypo_core::errors::StateError;
use hypo_core::ids::DeviceId;
use hypo_core::network::SyncEnvelope;
use hypo_core::ports::{KeyStorePort, PairedDeviceRepositoryPort};

use crate::coordinator::SyncCoordinator;

/// Decodes a wire frame back into a [`ClipboardEntry`] and hands it to the
/// coordinator (§4.10). Holds no mutable state of its own — the echo
/// window and round-trip table both live on [`SyncCoordinator`].
pub struct IncomingHandler {
    key_store: Arc<dyn KeyStorePort>,
    paired_devices: Arc<dyn PairedDeviceRepositoryPort>,
    coordinator: Arc<SyncCoordinator>,
    local_device_id: DeviceId,
}

impl IncomingHandler {
    pub fn new(
        key_store: Arc<dyn KeyStorePort>,
        paired_devices: Arc<dyn PairedDeviceRepositoryPort>,
        coordinator: Arc<SyncCoordinator>,
        local_device_id: DeviceId,
    ) -> Self {
        Self { key_store, paired_devices, coordinator, local_device_id }
    }

    /// Handle one already-frame-decoded [`SyncEnvelope`] received over
    /// `source`. The caller (the LAN or cloud receive loop) is responsible
    /// for `decode_frame`; this only does the crypto/application steps
    /// (§4.10).
    pub async fn handle(&self, envelope: SyncEnvelope, source: TransportOrigin) {
        let span = info_span!("incoming_handler.handle", envelope_id = %envelope.id, origin = %envelope.payload.device_id);
        self.handle_inner(envelope, source).instrument(span).await
    }

    async fn handle_inner(&self, envelope: SyncEnvelope, source: TransportOrigin) {
        // A self-echo (relay or LAN loopback reflecting our own send back
        // to us) is what round-trip timing is measured from; check before
        // the loop-suppression discard below removes it (§4.10).
        self.coordinator.observe_round_trip(&envelope.id);

        if envelope.payload.device_id == self.local_device_id {
            debug!("discarding envelope: origin is the local device (loop)");
            return;
        }

        let key = match self.key_store.load(&envelope.payload.device_id).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!(error = %StateError::MissingKey, "discarding envelope: no key for origin device");
                return;
            }
            Err(err) => {
                warn!(error = %err, "discarding envelope: key lookup failed");
                return;
            }
        };

        let decoded = match hypo_codec::decode_envelope(&envelope, Some(&key)) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, "discarding envelope: decode failed");
                return;
            }
        };

        let (origin_platform, origin_name) = match self.paired_devices.get(&decoded.origin).await {
            Ok(Some(device)) => (device.platform, device.name),
            Ok(None) => {
                warn!(origin = %decoded.origin, "no paired-device record for envelope origin, using placeholder metadata");
                (Platform::Unknown, String::new())
            }
            Err(err) => {
                warn!(error = %err, "paired-device lookup failed, using placeholder metadata");
                (Platform::Unknown, String::new())
            }
        };

        let entry = ClipboardEntry::new(decoded.origin, origin_platform, origin_name, decoded.content, source, decoded.encrypted);

        if let Err(err) = self.coordinator.handle_entry(entry, true).await {
            warn!(error = %err, "failed to hand decoded entry to sync coordinator");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use hypo_core::clipboard::ClipboardContent;
    use hypo_core::device::PairedDevice;
    use hypo_core::errors::CryptoError;
    use hypo_core::ids::{EnvelopeId, PeerKey};
    use hypo_core::ports::{HistoryStorePort, NotifierPort, PreferencesPort};
    use hypo_transport::TransportManager;

    use crate::metrics::Metrics;

    struct TestHistory {
        inserted: Arc<Mutex<Vec<ClipboardEntry>>>,
    }

    #[async_trait]
    impl HistoryStorePort for TestHistory {
        async fn insert_if_new(&self, entry: ClipboardEntry) -> Result<bool, StateError> {
            self.inserted.lock().unwrap().push(entry);
            Ok(true)
        }
        async fn contains_dedup_key(&self, _origin: &DeviceId, _content_hash: &str) -> Result<bool, StateError> {
            Ok(false)
        }
    }

    struct TestKeyStore {
        key: Option<PeerKey>,
        load_calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl KeyStorePort for TestKeyStore {
        async fn store(&self, _device_id: &DeviceId, _key: PeerKey) -> Result<(), CryptoError> {
            Ok(())
        }
        async fn load(&self, _device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError> {
            self.load_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(self.key.clone())
        }
        async fn delete(&self, _device_id: &DeviceId) -> Result<(), CryptoError> {
            Ok(())
        }
        async fn list_ids(&self) -> Result<Vec<DeviceId>, CryptoError> {
            Ok(Vec::new())
        }
    }

    struct TestPairedDevices;

    #[async_trait]
    impl PairedDeviceRepositoryPort for TestPairedDevices {
        async fn upsert(&self, _device: PairedDevice) -> Result<(), StateError> {
            Ok(())
        }
        async fn get(&self, _device_id: &DeviceId) -> Result<Option<PairedDevice>, StateError> {
            Ok(None)
        }
        async fn list(&self) -> Result<Vec<PairedDevice>, StateError> {
            Ok(Vec::new())
        }
        async fn remove(&self, _device_id: &DeviceId) -> Result<(), StateError> {
            Ok(())
        }
    }

    struct TestNotifier;

    #[async_trait]
    impl NotifierPort for TestNotifier {
        async fn show(&self, _entry: &ClipboardEntry) {}
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

    fn sample_envelope(origin: &DeviceId, local_target: &DeviceId, key: Option<&PeerKey>) -> SyncEnvelope {
        let content = ClipboardContent::Text { text: "from the wire".into() };
        hypo_codec::encode_envelope(&content, origin, local_target, key).unwrap()
    }

    fn build(
        key: Option<PeerKey>,
        local_id: DeviceId,
    ) -> (
        IncomingHandler,
        Arc<Mutex<Vec<ClipboardEntry>>>,
        Arc<Metrics>,
        Arc<SyncCoordinator>,
        Arc<std::sync::atomic::AtomicUsize>,
    ) {
        let inserted = Arc::new(Mutex::new(Vec::new()));
        let metrics = Arc::new(Metrics::new());
        let load_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::new(TestHistory { inserted: inserted.clone() }),
            Arc::new(TestKeyStore { key: key.clone(), load_calls: load_calls.clone() }),
            Arc::new(TestPairedDevices),
            Arc::new(TestPreferences),
            Arc::new(TestNotifier),
            Arc::new(TransportManager::new()),
            metrics.clone(),
            local_id.clone(),
        ));
        let handler = IncomingHandler::new(
            Arc::new(TestKeyStore { key, load_calls: load_calls.clone() }),
            Arc::new(TestPairedDevices),
            coordinator.clone(),
            local_id,
        );
        (handler, inserted, metrics, coordinator, load_calls)
    }

    #[tokio::test]
    async fn envelope_from_local_device_is_discarded_as_loop() {
        let local_id = DeviceId::generate();
        let key = PeerKey::from_bytes([1u8; 32]);
        let (handler, _, _, _, load_calls) = build(Some(key.clone()), local_id.clone());

        let envelope = sample_envelope(&local_id, &local_id, Some(&key));
        handler.handle(envelope, TransportOrigin::Lan).await;

        assert_eq!(load_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn envelope_with_no_key_for_origin_is_discarded() {
        let local_id = DeviceId::generate();
        let peer_id = DeviceId::generate();
        let (handler, _, _, _, _) = build(None, local_id.clone());

        let envelope = sample_envelope(&peer_id, &local_id, None);
        handler.handle(envelope, TransportOrigin::Lan).await;
    }

    #[tokio::test]
    async fn valid_envelope_is_decoded_and_forwarded_to_coordinator() {
        let local_id = DeviceId::generate();
        let peer_id = DeviceId::generate();
        let key = PeerKey::from_bytes([3u8; 32]);
        let (handler, inserted, _, _, _) = build(Some(key.clone()), local_id.clone());

        let envelope = sample_envelope(&peer_id, &local_id, Some(&key));
        handler.handle(envelope, TransportOrigin::Cloud).await;

        let inserted = inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].origin_device_id, peer_id);
        assert_eq!(inserted[0].transport_origin, TransportOrigin::Cloud);
        assert_eq!(inserted[0].content, ClipboardContent::Text { text: "from the wire".into() });
    }

    #[tokio::test]
    async fn matching_envelope_id_records_a_round_trip_sample() {
        let local_id = DeviceId::generate();
        let peer_id = DeviceId::generate();
        let key = PeerKey::from_bytes([5u8; 32]);
        let (handler, _, metrics, coordinator, _) = build(Some(key.clone()), local_id.clone());

        let mut envelope = sample_envelope(&peer_id, &local_id, Some(&key));
        let pending_id = EnvelopeId::new();
        envelope.id = pending_id.clone();
        coordinator.record_pending_round_trip(pending_id);

        handler.handle(envelope, TransportOrigin::Cloud).await;

        assert_eq!(metrics.round_trip_durations().len(), 1);
    }
}

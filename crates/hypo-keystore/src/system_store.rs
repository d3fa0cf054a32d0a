use async_trait::async_trait;
use keyring::Entry;

use hypo_core::errors::CryptoError;
use hypo_core::ids::{DeviceId, PeerKey};
use hypo_core::ports::KeyStorePort;

use crate::index::KeyIndex;

const SERVICE_NAME: &str = "Hypo";
const KEY_PREFIX: &str = "peerkey:v1:";

fn username(device_id: &DeviceId) -> String {
    format!("{KEY_PREFIX}{device_id}")
}

trait KeyringEntryOps {
    fn get_secret(&self) -> Result<Vec<u8>, keyring::Error>;
    fn set_secret(&self, secret: &[u8]) -> Result<(), keyring::Error>;
    fn delete_credential(&self) -> Result<(), keyring::Error>;
}

trait KeyringBackend {
    type Entry: KeyringEntryOps;
    fn new_entry(&self, service: &str, username: &str) -> Result<Self::Entry, keyring::Error>;
}

struct RealBackend;
struct RealEntry(Entry);

impl KeyringEntryOps for RealEntry {
    fn get_secret(&self) -> Result<Vec<u8>, keyring::Error> {
        self.0.get_secret()
    }
    fn set_secret(&self, secret: &[u8]) -> Result<(), keyring::Error> {
        self.0.set_secret(secret)
    }
    fn delete_credential(&self) -> Result<(), keyring::Error> {
        self.0.delete_credential()
    }
}

impl KeyringBackend for RealBackend {
    type Entry = RealEntry;
    fn new_entry(&self, service: &str, username: &str) -> Result<Self::Entry, keyring::Error> {
        Entry::new(service, username).map(RealEntry)
    }
}

fn load_with_backend<B: KeyringBackend>(backend: &B, device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError> {
    let entry = backend
        .new_entry(SERVICE_NAME, &username(device_id))
        .map_err(|e| CryptoError::InvalidKey(format!("failed to access keyring entry: {e}")))?;
    match entry.get_secret() {
        Ok(secret) => {
            let bytes: [u8; 32] = secret
                .try_into()
                .map_err(|_| CryptoError::InvalidKey("peer key is not 32 bytes".into()))?;
            Ok(Some(PeerKey::from_bytes(bytes)))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(CryptoError::InvalidKey(e.to_string())),
    }
}

fn store_with_backend<B: KeyringBackend>(backend: &B, device_id: &DeviceId, key: &PeerKey) -> Result<(), CryptoError> {
    let entry = backend
        .new_entry(SERVICE_NAME, &username(device_id))
        .map_err(|e| CryptoError::InvalidKey(format!("failed to access keyring entry: {e}")))?;
    entry.set_secret(key.as_bytes()).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

fn delete_with_backend<B: KeyringBackend>(backend: &B, device_id: &DeviceId) -> Result<(), CryptoError> {
    let entry = backend
        .new_entry(SERVICE_NAME, &username(device_id))
        .map_err(|e| CryptoError::InvalidKey(format!("failed to access keyring entry: {e}")))?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(CryptoError::InvalidKey(e.to_string())),
    }
}

/// `KeyStorePort` backed directly by the OS keyring. The side [`KeyIndex`]
/// is what makes `list_ids` possible — the keyring API itself only supports
/// point lookups by username.
pub struct SystemKeyStore {
    index: KeyIndex,
}

impl SystemKeyStore {
    pub fn new(index_path: std::path::PathBuf) -> Self {
        Self { index: KeyIndex::new(index_path) }
    }
}

#[async_trait]
impl KeyStorePort for SystemKeyStore {
    async fn store(&self, device_id: &DeviceId, key: PeerKey) -> Result<(), CryptoError> {
        store_with_backend(&RealBackend, device_id, &key)?;
        self.index.add(device_id).await
    }

    async fn load(&self, device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError> {
        load_with_backend(&RealBackend, device_id)
    }

    async fn delete(&self, device_id: &DeviceId) -> Result<(), CryptoError> {
        delete_with_backend(&RealBackend, device_id)?;
        self.index.remove(device_id).await
    }

    async fn list_ids(&self) -> Result<Vec<DeviceId>, CryptoError> {
        self.index.list().await
    }
}

use async_trait::async_trait;
use hypo_core::errors::CryptoError;
use hypo_core::ids::{DeviceId, PeerKey};
use hypo_core::ports::KeyStorePort;

use crate::capability::{detect_storage_capability, SecureStorageCapability};
use crate::file_store::FileKeyStore;
use crate::system_store::SystemKeyStore;

/// Selects [`SystemKeyStore`] or [`FileKeyStore`] at construction time based
/// on [`detect_storage_capability`], so callers write to one `KeyStorePort`
/// without branching on platform themselves.
pub enum PlatformKeyStore {
    System(SystemKeyStore),
    File(FileKeyStore),
}

impl PlatformKeyStore {
    pub fn detect(index_path: std::path::PathBuf) -> Result<Self, std::io::Error> {
        match detect_storage_capability() {
            SecureStorageCapability::SystemKeyring => Ok(Self::System(SystemKeyStore::new(index_path))),
            SecureStorageCapability::FileBasedKeystore | SecureStorageCapability::Unsupported => {
                Ok(Self::File(FileKeyStore::new(index_path.parent().map(|p| p.to_path_buf()).unwrap_or(index_path))))
            }
        }
    }
}

#[async_trait]
impl KeyStorePort for PlatformKeyStore {
    async fn store(&self, device_id: &DeviceId, key: PeerKey) -> Result<(), CryptoError> {
        match self {
            Self::System(s) => s.store(device_id, key).await,
            Self::File(s) => s.store(device_id, key).await,
        }
    }

    async fn load(&self, device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError> {
        match self {
            Self::System(s) => s.load(device_id).await,
            Self::File(s) => s.load(device_id).await,
        }
    }

    async fn delete(&self, device_id: &DeviceId) -> Result<(), CryptoError> {
        match self {
            Self::System(s) => s.delete(device_id).await,
            Self::File(s) => s.delete(device_id).await,
        }
    }

    async fn list_ids(&self) -> Result<Vec<DeviceId>, CryptoError> {
        match self {
            Self::System(s) => s.list_ids().await,
            Self::File(s) => s.list_ids().await,
        }
    }
}

//! File-based fallback for platforms without a usable system keyring
//! (WSL, headless Linux). Less secure than the OS keyring; development and
//! degraded-environment use only.

use std::path::PathBuf;

use async_trait::async_trait;
use hypo_core::errors::CryptoError;
use hypo_core::ids::{DeviceId, PeerKey};
use hypo_core::ports::KeyStorePort;
use tokio::fs;

use crate::index::KeyIndex;

const KEY_PREFIX: &str = "peerkey:v1:";

pub struct FileKeyStore {
    base_dir: PathBuf,
    index: KeyIndex,
}

impl FileKeyStore {
    pub fn new(base_dir: PathBuf) -> Self {
        let index = KeyIndex::new(base_dir.join("peerkey-index.json"));
        Self { base_dir, index }
    }

    /// Default location: `~/.config/hypo/keys/`.
    pub fn default_location() -> Result<Self, std::io::Error> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no config dir"))?
            .join("hypo")
            .join("keys");
        Ok(Self::new(base_dir))
    }

    fn key_path(&self, device_id: &DeviceId) -> PathBuf {
        self.base_dir.join(format!("{KEY_PREFIX}{device_id}.bin"))
    }
}

#[async_trait]
impl KeyStorePort for FileKeyStore {
    async fn store(&self, device_id: &DeviceId, key: PeerKey) -> Result<(), CryptoError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| CryptoError::InvalidKey(format!("failed to create key dir: {e}")))?;
        let path = self.key_path(device_id);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, key.as_bytes())
            .await
            .map_err(|e| CryptoError::InvalidKey(format!("failed to write key file: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| CryptoError::InvalidKey(format!("failed to commit key file: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)
                .await
                .map_err(|e| CryptoError::InvalidKey(format!("failed to stat key file: {e}")))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)
                .await
                .map_err(|e| CryptoError::InvalidKey(format!("failed to chmod key file: {e}")))?;
        }

        self.index.add(device_id).await
    }

    async fn load(&self, device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError> {
        match fs::read(self.key_path(device_id)).await {
            Ok(bytes) => {
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| CryptoError::InvalidKey("key file is not 32 bytes".into()))?;
                Ok(Some(PeerKey::from_bytes(arr)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CryptoError::InvalidKey(format!("failed to read key file: {e}"))),
        }
    }

    async fn delete(&self, device_id: &DeviceId) -> Result<(), CryptoError> {
        match fs::remove_file(self.key_path(device_id)).await {
            Ok(()) | Err(_) => {}
        }
        self.index.remove(device_id).await
    }

    async fn list_ids(&self) -> Result<Vec<DeviceId>, CryptoError> {
        self.index.list().await
    }
}

//! A small on-disk index of which device ids have a stored key.
//!
//! Neither the OS keyring API nor this crate's file backend can enumerate
//! their own entries portably, so [`KeyStorePort::list_ids`] is served from
//! this side index instead. It carries no key material, only ids, so it's
//! safe to keep outside the secret store proper.

use std::path::{Path, PathBuf};

use hypo_core::errors::CryptoError;
use hypo_core::ids::DeviceId;
use tokio::fs;

pub struct KeyIndex {
    path: PathBuf,
}

impl KeyIndex {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn list(&self) -> Result<Vec<DeviceId>, CryptoError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| CryptoError::InvalidKey(format!("corrupt key index: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CryptoError::InvalidKey(format!("failed to read key index: {e}"))),
        }
    }

    pub async fn add(&self, device_id: &DeviceId) -> Result<(), CryptoError> {
        let mut ids = self.list().await?;
        if !ids.contains(device_id) {
            ids.push(device_id.clone());
            self.write(&ids).await?;
        }
        Ok(())
    }

    pub async fn remove(&self, device_id: &DeviceId) -> Result<(), CryptoError> {
        let mut ids = self.list().await?;
        let before = ids.len();
        ids.retain(|id| id != device_id);
        if ids.len() != before {
            self.write(&ids).await?;
        }
        Ok(())
    }

    async fn write(&self, ids: &[DeviceId]) -> Result<(), CryptoError> {
        if let Some(parent) = Path::new(&self.path).parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CryptoError::InvalidKey(format!("failed to create index dir: {e}")))?;
        }
        let json = serde_json::to_string(ids)
            .map_err(|e| CryptoError::InvalidKey(format!("failed to serialize key index: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| CryptoError::InvalidKey(format!("failed to write key index: {e}")))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CryptoError::InvalidKey(format!("failed to commit key index: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let index = KeyIndex::new(dir.path().join("index.json"));
        let id = DeviceId::generate();
        index.add(&id).await.unwrap();
        assert_eq!(index.list().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn remove_drops_the_id() {
        let dir = tempfile::tempdir().unwrap();
        let index = KeyIndex::new(dir.path().join("index.json"));
        let id = DeviceId::generate();
        index.add(&id).await.unwrap();
        index.remove(&id).await.unwrap();
        assert!(index.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_index_file_is_an_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let index = KeyIndex::new(dir.path().join("missing.json"));
        assert!(index.list().await.unwrap().is_empty());
    }
}

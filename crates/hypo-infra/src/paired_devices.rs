use std::path::PathBuf;

use async_trait::async_trait;
use hypo_core::device::PairedDevice;
use hypo_core::errors::StateError;
use hypo_core::ids::DeviceId;
use hypo_core::ports::PairedDeviceRepositoryPort;
use tokio::fs;
use tokio::sync::Mutex;

/// File-backed paired-device metadata (§6.5 namespace b). Serializes the
/// whole table on every write; fine at the scale this crate deals in
/// (a handful to a few dozen paired devices per install).
///
/// An in-process `Mutex` serializes read-modify-write cycles across
/// concurrent callers; the file itself is replaced atomically so a reader
/// never observes a partial write.
pub struct FilePairedDeviceRepository {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FilePairedDeviceRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    async fn read_all(&self) -> Result<Vec<PairedDevice>, StateError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| StateError::Io(format!("parse paired devices: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StateError::Io(format!("read paired devices {}: {e}", self.path.display()))),
        }
    }

    async fn write_all(&self, devices: &[PairedDevice]) -> Result<(), StateError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| StateError::Io(format!("create paired devices dir {}: {e}", dir.display())))?;
        }

        let content = serde_json::to_string_pretty(devices).map_err(|e| StateError::Io(format!("serialize paired devices: {e}")))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await.map_err(|e| StateError::Io(format!("write temp paired devices {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StateError::Io(format!("rename paired devices {} -> {}: {e}", tmp_path.display(), self.path.display())))
    }
}

#[async_trait]
impl PairedDeviceRepositoryPort for FilePairedDeviceRepository {
    async fn upsert(&self, device: PairedDevice) -> Result<(), StateError> {
        let _lock = self.guard.lock().await;
        let mut devices = self.read_all().await?;
        if let Some(existing) = devices.iter_mut().find(|d| d.device_id == device.device_id) {
            *existing = device;
        } else {
            devices.push(device);
        }
        self.write_all(&devices).await
    }

    async fn get(&self, device_id: &DeviceId) -> Result<Option<PairedDevice>, StateError> {
        let devices = self.read_all().await?;
        Ok(devices.into_iter().find(|d| &d.device_id == device_id))
    }

    async fn list(&self) -> Result<Vec<PairedDevice>, StateError> {
        self.read_all().await
    }

    async fn remove(&self, device_id: &DeviceId) -> Result<(), StateError> {
        let _lock = self.guard.lock().await;
        let mut devices = self.read_all().await?;
        devices.retain(|d| &d.device_id != device_id);
        self.write_all(&devices).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypo_core::device::Platform;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("hypo-paired-devices-test-{}", uuid::Uuid::new_v4())).join("devices.json")
    }

    #[tokio::test]
    async fn list_on_missing_file_is_empty() {
        let repo = FilePairedDeviceRepository::new(temp_path());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let path = temp_path();
        let repo = FilePairedDeviceRepository::new(&path);
        let device = PairedDevice::new(DeviceId::generate(), "laptop", Platform::Linux);

        repo.upsert(device.clone()).await.unwrap();
        let loaded = repo.get(&device.device_id).await.unwrap().unwrap();
        assert_eq!(loaded.device_id, device.device_id);
        assert_eq!(loaded.name, "laptop");

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn upsert_replaces_existing_entry_for_same_device() {
        let path = temp_path();
        let repo = FilePairedDeviceRepository::new(&path);
        let id = DeviceId::generate();

        repo.upsert(PairedDevice::new(id.clone(), "old-name", Platform::Linux)).await.unwrap();
        repo.upsert(PairedDevice::new(id.clone(), "new-name", Platform::Linux)).await.unwrap();

        let devices = repo.list().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "new-name");

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let path = temp_path();
        let repo = FilePairedDeviceRepository::new(&path);
        let device = PairedDevice::new(DeviceId::generate(), "phone", Platform::MacOS);

        repo.upsert(device.clone()).await.unwrap();
        repo.remove(&device.device_id).await.unwrap();

        assert!(repo.get(&device.device_id).await.unwrap().is_none());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}

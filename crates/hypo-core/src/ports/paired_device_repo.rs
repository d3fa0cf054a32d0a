use async_trait::async_trait;

use crate::device::PairedDevice;
use crate::errors::StateError;
use crate::ids::DeviceId;

/// Preferences-file persistence for paired-device metadata (§6.5 namespace
/// b). Never touches key material — that's [`crate::ports::KeyStorePort`]'s
/// job, deliberately kept in a separate trait so the two namespaces can
/// never be conflated by a caller holding only one of them.
#[async_trait]
pub trait PairedDeviceRepositoryPort: Send + Sync {
    async fn upsert(&self, device: PairedDevice) -> Result<(), StateError>;
    async fn get(&self, device_id: &DeviceId) -> Result<Option<PairedDevice>, StateError>;
    async fn list(&self) -> Result<Vec<PairedDevice>, StateError>;
    async fn remove(&self, device_id: &DeviceId) -> Result<(), StateError>;
}

#[cfg(test)]
mockall::mock! {
    pub PairedDeviceRepository {}

    #[async_trait]
    impl PairedDeviceRepositoryPort for PairedDeviceRepository {
        async fn upsert(&self, device: PairedDevice) -> Result<(), StateError>;
        async fn get(&self, device_id: &DeviceId) -> Result<Option<PairedDevice>, StateError>;
        async fn list(&self) -> Result<Vec<PairedDevice>, StateError>;
        async fn remove(&self, device_id: &DeviceId) -> Result<(), StateError>;
    }
}

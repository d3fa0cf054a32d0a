use async_trait::async_trait;

use crate::errors::CryptoError;
use crate::ids::{DeviceId, PeerKey};

/// The per-peer symmetric key contract (§4.2). Backed by OS-provided secret
/// storage; keys never land in application files in plaintext.
///
/// Concurrent `store` calls for distinct ids must not serialize; for the
/// same id the last writer wins but never partially (an implementation must
/// not observe a torn write).
#[async_trait]
pub trait KeyStorePort: Send + Sync {
    async fn store(&self, device_id: &DeviceId, key: PeerKey) -> Result<(), CryptoError>;
    async fn load(&self, device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError>;
    async fn delete(&self, device_id: &DeviceId) -> Result<(), CryptoError>;
    async fn list_ids(&self) -> Result<Vec<DeviceId>, CryptoError>;
}

#[cfg(test)]
mockall::mock! {
    pub KeyStore {}

    #[async_trait]
    impl KeyStorePort for KeyStore {
        async fn store(&self, device_id: &DeviceId, key: PeerKey) -> Result<(), CryptoError>;
        async fn load(&self, device_id: &DeviceId) -> Result<Option<PeerKey>, CryptoError>;
        async fn delete(&self, device_id: &DeviceId) -> Result<(), CryptoError>;
        async fn list_ids(&self) -> Result<Vec<DeviceId>, CryptoError>;
    }
}

use async_trait::async_trait;

use crate::clipboard::ClipboardEntry;
use crate::errors::StateError;
use crate::ids::DeviceId;

/// The durable history store's minimal interface (§9). Its own encryption-
/// at-rest policy, retention, and schema are out of scope here; this crate
/// only needs insert-once-per-dedup-key and point lookups.
#[async_trait]
pub trait HistoryStorePort: Send + Sync {
    /// Insert `entry` unless an entry with the same `(origin_device_id,
    /// content_hash)` already exists. Returns `true` if inserted.
    async fn insert_if_new(&self, entry: ClipboardEntry) -> Result<bool, StateError>;

    async fn contains_dedup_key(&self, origin: &DeviceId, content_hash: &str) -> Result<bool, StateError>;
}

#[cfg(test)]
mockall::mock! {
    pub HistoryStore {}

    #[async_trait]
    impl HistoryStorePort for HistoryStore {
        async fn insert_if_new(&self, entry: ClipboardEntry) -> Result<bool, StateError>;
        async fn contains_dedup_key(&self, origin: &DeviceId, content_hash: &str) -> Result<bool, StateError>;
    }
}

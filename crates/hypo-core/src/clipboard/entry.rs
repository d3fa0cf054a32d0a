use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::clipboard::ClipboardContent;
use crate::device::Platform;
use crate::ids::{DeviceId, EntryId};

/// Which transport delivered this entry, or `Local` if it originated on
/// this device and was never received over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportOrigin {
    Lan,
    Cloud,
    Local,
}

/// A single clipboard event, local or remote.
///
/// Invariant: `preview` is deterministically derived from `content`; two
/// entries with byte-identical normalized content are duplicates regardless
/// of `id` (see [`ClipboardEntry::content_hash`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub id: EntryId,
    pub origin_device_id: DeviceId,
    pub origin_platform: Platform,
    pub origin_name: String,
    pub timestamp: DateTime<Utc>,
    pub content: ClipboardContent,
    pub pinned: bool,
    pub preview: String,
    pub transport_origin: TransportOrigin,
    pub encrypted: bool,
}

impl ClipboardEntry {
    pub fn new(
        origin_device_id: DeviceId,
        origin_platform: Platform,
        origin_name: impl Into<String>,
        content: ClipboardContent,
        transport_origin: TransportOrigin,
        encrypted: bool,
    ) -> Self {
        let preview = content.preview();
        Self {
            id: EntryId::new(),
            origin_device_id,
            origin_platform,
            origin_name: origin_name.into(),
            timestamp: Utc::now(),
            content,
            pinned: false,
            preview,
            transport_origin,
            encrypted,
        }
    }

    /// SHA-256 of the normalized content bytes. Used as the duplicate-
    /// detection key together with `origin_device_id`, and as the echo
    /// window signature together with the origin id.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.normalized_bytes());
        hex::encode(hasher.finalize())
    }

    /// `(origin_device_id, content_hash)` — the history store's dedup key.
    pub fn dedup_key(&self) -> (DeviceId, String) {
        (self.origin_device_id.clone(), self.content_hash())
    }
}

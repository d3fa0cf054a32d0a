//! Identifier and key-material wrapper types.

mod device_id;
mod id_macro;
mod peer_key;

pub use device_id::DeviceId;
pub use peer_key::PeerKey;

pub(crate) use id_macro::impl_id;

use uuid::Uuid;

/// Envelope identifier. Always a UUID v4, printed lowercase without braces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EnvelopeId(String);
impl_id!(EnvelopeId);

/// Clipboard entry identifier. Always a UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EntryId(String);
impl_id!(EntryId);

/// Pairing session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SessionId(String);
impl_id!(SessionId);

impl EnvelopeId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

use std::fmt;
use uuid::Uuid;

/// A device identifier: a 128-bit value, canonically a lowercase 32-character
/// hex string with no dashes and no platform prefix.
///
/// This is the exact form bound into AEAD as additional authenticated data
/// (see `hypo_crypto`), so equality and hashing both operate on the
/// canonical lowercase form — never on whatever case a peer happened to send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Generate a new random device id, stable for the lifetime of the install.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse and canonicalize an id received from a peer or loaded from disk.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        if lower.len() == 32 && lower.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(lower))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

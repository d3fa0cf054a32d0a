use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 256-bit symmetric key shared with exactly one paired peer.
///
/// Owned exclusively by `hypo-keystore` once persisted; callers that borrow
/// a copy for a single encrypt/decrypt call should let it drop immediately
/// after use. The byte buffer is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PeerKey([u8; 32]);

impl PeerKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for PeerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PeerKey").field(&"[REDACTED]").finish()
    }
}

impl PartialEq for PeerKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.ct_eq(&other.0).into()
    }
}
impl Eq for PeerKey {}

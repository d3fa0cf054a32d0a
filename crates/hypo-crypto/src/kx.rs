use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// An ephemeral or static X25519 key pair used for ECDH during pairing
/// (§4.7). Pairing sessions generate a fresh pair per attempt; nothing in
/// this crate persists one.
pub struct KxKeyPair {
    secret: Zeroizing<StaticSecret>,
    public: PublicKey,
}

impl KxKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret: Zeroizing::new(secret), public }
    }

    pub fn from_bytes(secret: [u8; 32]) -> Self {
        let secret = StaticSecret::from(secret);
        let public = PublicKey::from(&secret);
        Self { secret: Zeroizing::new(secret), public }
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    pub fn secret(&self) -> &StaticSecret {
        &self.secret
    }
}

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

/// Fixed salt for every HKDF derivation in this crate. The per-purpose
/// `info` label, not the salt, is what domain-separates different derived
/// keys from the same ECDH output.
const HKDF_SALT: &[u8] = b"hypo-hkdf-salt-v1";

/// `HKDF-SHA-256(X25519(local_priv, peer_pub), info)` (§4.1).
pub fn derive(local_priv: &StaticSecret, peer_pub: &PublicKey, info: &[u8]) -> [u8; 32] {
    let shared = local_priv.diffie_hellman(peer_pub);
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared.as_bytes());
    let mut out = [0u8; 32];
    hk.expand(info, &mut out).expect("32 bytes is a valid HKDF-SHA-256 output length");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kx::KxKeyPair;

    #[test]
    fn derive_is_symmetric_between_peers() {
        let a = KxKeyPair::generate();
        let b = KxKeyPair::generate();
        let b_pub = PublicKey::from(b.public_bytes());
        let a_pub = PublicKey::from(a.public_bytes());
        let k1 = derive(a.secret(), &b_pub, b"hypo-pair-v1");
        let k2 = derive(b.secret(), &a_pub, b"hypo-pair-v1");
        assert_eq!(k1, k2);
    }

    #[test]
    fn different_info_labels_produce_different_keys() {
        let a = KxKeyPair::generate();
        let b = KxKeyPair::generate();
        let b_pub = PublicKey::from(b.public_bytes());
        let k1 = derive(a.secret(), &b_pub, b"hypo-pair-v1");
        let k2 = derive(a.secret(), &b_pub, b"hypo-ack-v1");
        assert_ne!(k1, k2);
    }
}

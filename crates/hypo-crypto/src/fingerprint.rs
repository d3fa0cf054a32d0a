use sha2::{Digest, Sha256};

/// Identity fingerprint published in the mDNS TXT record (`fingerprint_sha256`,
/// §6.3) and shown out-of-band for pairing verification: SHA-256 of the
/// concatenated X25519 and Ed25519 public keys, hex-encoded.
pub fn identity_fingerprint(kx_pub: &[u8; 32], signing_pub: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kx_pub);
    hasher.update(signing_pub);
    hex::encode(hasher.finalize())
}

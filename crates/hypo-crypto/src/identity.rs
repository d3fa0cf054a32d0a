use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hypo_core::errors::CryptoError;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// A device's long-lived Ed25519 identity. Used to sign the advertised
/// X25519 key bundle (§4.7 step 1) so peers can verify it hasn't been
/// substituted before they trust a pairing request.
pub struct IdentityKeyPair {
    signing: Zeroizing<SigningKey>,
}

impl IdentityKeyPair {
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        Self { signing: Zeroizing::new(signing) }
    }

    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self { signing: Zeroizing::new(SigningKey::from_bytes(secret)) }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing.to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    pub fn verifying_bytes(&self) -> [u8; 32] {
        self.verifying_key().to_bytes()
    }

    /// Sign `bytes`, producing a 64-byte Ed25519 signature.
    pub fn sign(&self, bytes: &[u8]) -> [u8; 64] {
        self.signing.sign(bytes).to_bytes()
    }
}

/// Verify `sig` over `bytes` against `verifying_key_bytes`.
pub fn verify(verifying_key_bytes: &[u8; 32], bytes: &[u8], sig: &[u8; 64]) -> Result<bool, CryptoError> {
    let key = VerifyingKey::from_bytes(verifying_key_bytes)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let signature = Signature::from_bytes(sig);
    Ok(key.verify(bytes, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_succeeds() {
        let kp = IdentityKeyPair::generate();
        let msg = b"hypo-pair-v1 bundle";
        let sig = kp.sign(msg);
        assert!(verify(&kp.verifying_bytes(), msg, &sig).unwrap());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let kp = IdentityKeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(!verify(&kp.verifying_bytes(), b"tampered", &sig).unwrap());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let a = IdentityKeyPair::generate();
        let b = IdentityKeyPair::generate();
        let sig = a.sign(b"msg");
        assert!(!verify(&b.verifying_bytes(), b"msg", &sig).unwrap());
    }
}

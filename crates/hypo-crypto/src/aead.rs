use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hypo_core::errors::CryptoError;
use rand::RngCore;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// An AES-256-GCM sealed message with its nonce and tag split out, matching
/// the wire envelope's `encryption { nonce, tag }` fields (§6.2) rather than
/// the combined ciphertext||tag layout `aes-gcm` produces internally.
#[derive(Debug, Clone)]
pub struct SealedMessage {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

/// Encrypt `plaintext` under `key` with the given `aad`. A fresh CSPRNG
/// nonce is drawn unless `nonce` is supplied (tests only — production
/// callers must never reuse a nonce with the same key).
pub fn encrypt(
    plaintext: &[u8],
    key: &[u8; 32],
    aad: &[u8],
    nonce: Option<[u8; NONCE_LEN]>,
) -> Result<SealedMessage, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce_bytes = nonce.unwrap_or_else(|| {
        let mut n = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut n);
        n
    });
    let combined = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::Encrypt)?;
    if combined.len() < TAG_LEN {
        return Err(CryptoError::Encrypt);
    }
    let split_at = combined.len() - TAG_LEN;
    let (ct, tag) = combined.split_at(split_at);
    let mut tag_arr = [0u8; TAG_LEN];
    tag_arr.copy_from_slice(tag);
    Ok(SealedMessage { ciphertext: ct.to_vec(), nonce: nonce_bytes, tag: tag_arr })
}

/// Decrypt a [`SealedMessage`], failing with [`CryptoError::BadAuth`] if the
/// tag doesn't verify against `aad`.
pub fn decrypt(sealed: &SealedMessage, key: &[u8; 32], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut combined = Vec::with_capacity(sealed.ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(&sealed.ciphertext);
    combined.extend_from_slice(&sealed.tag);
    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), Payload { msg: &combined, aad })
        .map_err(|_| CryptoError::BadAuth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        [7u8; 32]
    }

    #[test]
    fn round_trips_with_matching_aad() {
        let sealed = encrypt(b"hello hypo", &key(), b"target-device-id", None).unwrap();
        let out = decrypt(&sealed, &key(), b"target-device-id").unwrap();
        assert_eq!(out, b"hello hypo");
    }

    #[test]
    fn wrong_aad_fails_with_bad_auth() {
        let sealed = encrypt(b"hello", &key(), b"aad-a", None).unwrap();
        let err = decrypt(&sealed, &key(), b"aad-b").unwrap_err();
        assert!(matches!(err, CryptoError::BadAuth));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let mut sealed = encrypt(b"hello", &key(), b"aad", None).unwrap();
        sealed.ciphertext[0] ^= 0xFF;
        assert!(matches!(decrypt(&sealed, &key(), b"aad"), Err(CryptoError::BadAuth)));
    }

    #[test]
    fn distinct_calls_draw_distinct_nonces() {
        let a = encrypt(b"x", &key(), b"aad", None).unwrap();
        let b = encrypt(b"x", &key(), b"aad", None).unwrap();
        assert_ne!(a.nonce, b.nonce);
    }
}

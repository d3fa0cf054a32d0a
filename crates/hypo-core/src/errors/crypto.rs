use thiserror::Error;

/// Failures from key agreement, signing, and AEAD operations (§7).
///
/// Deliberately coarse: callers branch on variant, never on the message, and
/// the message never echoes key material or ciphertext.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signature or MAC verification failed")]
    BadAuth,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

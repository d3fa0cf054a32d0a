use thiserror::Error;

use hypo_core::clipboard::ClipboardContent;
use hypo_core::errors::{CodecError, CryptoError};
use hypo_core::ids::{DeviceId, PeerKey};
use hypo_core::network::{EncryptionMetadata, EnvelopePayload, MessageType, SyncEnvelope};

use crate::inner::{decode_inner, encode_inner};

/// Either stage of the encode/decode pipeline can fail; callers match on
/// the inner variant when they need to distinguish a malformed frame from
/// an authentication failure (§7 treats both as "drop the frame").
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// The result of successfully decoding an inbound envelope.
#[derive(Debug, Clone)]
pub struct DecodedEnvelope {
    pub content: ClipboardContent,
    pub origin: DeviceId,
    pub target: DeviceId,
    pub encrypted: bool,
}

/// Build a [`SyncEnvelope`] for `content` addressed to `target` (§4.3).
/// `key` is `None` only under the plaintext-debug toggle (§8 scenario 6);
/// production callers always supply the per-peer key.
pub fn encode_envelope(
    content: &ClipboardContent,
    origin: &DeviceId,
    target: &DeviceId,
    key: Option<&PeerKey>,
) -> Result<SyncEnvelope, PipelineError> {
    let inner_bytes = encode_inner(content)?;

    let (ciphertext, encryption) = match key {
        Some(key) => {
            let aad = target.as_str().as_bytes();
            let sealed = hypo_crypto::encrypt(&inner_bytes, key.as_bytes(), aad, None)?;
            (sealed.ciphertext, EncryptionMetadata { nonce: sealed.nonce.to_vec(), tag: sealed.tag.to_vec() })
        }
        None => (inner_bytes, EncryptionMetadata::plaintext()),
    };

    Ok(SyncEnvelope {
        id: hypo_core::ids::EnvelopeId::new(),
        message_type: MessageType::Clipboard,
        payload: EnvelopePayload {
            content_type: content.content_type().to_string(),
            ciphertext,
            device_id: origin.clone(),
            target: target.clone(),
            encryption,
        },
    })
}

/// Decrypt (if needed), decompress, and parse a [`SyncEnvelope`]'s payload
/// back into a [`ClipboardContent`] (§4.10). `key` must be the key stored
/// under the envelope's origin device id; callers look that up themselves
/// so a missing key surfaces as [`hypo_core::errors::StateError::MissingKey`]
/// rather than a codec error.
pub fn decode_envelope(envelope: &SyncEnvelope, key: Option<&PeerKey>) -> Result<DecodedEnvelope, PipelineError> {
    let payload = &envelope.payload;
    let encrypted = !payload.encryption.is_plaintext();

    let inner_bytes = if encrypted {
        let key = key.ok_or(CryptoError::InvalidKey("no key supplied for encrypted envelope".into()))?;
        if payload.encryption.nonce.len() != hypo_crypto::NONCE_LEN
            || payload.encryption.tag.len() != hypo_crypto::TAG_LEN
        {
            return Err(CodecError::Malformed("nonce/tag length mismatch".into()).into());
        }
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&payload.encryption.nonce);
        let mut tag = [0u8; 16];
        tag.copy_from_slice(&payload.encryption.tag);
        let sealed = hypo_crypto::SealedMessage { ciphertext: payload.ciphertext.clone(), nonce, tag };
        let aad = payload.target.as_str().as_bytes();
        hypo_crypto::decrypt(&sealed, key.as_bytes(), aad)?
    } else {
        payload.ciphertext.clone()
    };

    let content = decode_inner(&inner_bytes)?;
    Ok(DecodedEnvelope { content, origin: payload.device_id.clone(), target: payload.target.clone(), encrypted })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_round_trip_has_encrypted_false() {
        let content = ClipboardContent::Text { text: "Plain Hello".into() };
        let origin = DeviceId::generate();
        let target = DeviceId::generate();
        let envelope = encode_envelope(&content, &origin, &target, None).unwrap();
        assert!(envelope.payload.encryption.is_plaintext());
        let decoded = decode_envelope(&envelope, None).unwrap();
        assert!(!decoded.encrypted);
        assert_eq!(decoded.content, content);
    }

    #[test]
    fn encrypted_round_trip_requires_matching_key() {
        let content = ClipboardContent::Text { text: "Hello, Hypo!".into() };
        let origin = DeviceId::generate();
        let target = DeviceId::generate();
        let key = PeerKey::from_bytes([3u8; 32]);
        let envelope = encode_envelope(&content, &origin, &target, Some(&key)).unwrap();
        assert!(!envelope.payload.encryption.is_plaintext());

        let decoded = decode_envelope(&envelope, Some(&key)).unwrap();
        assert!(decoded.encrypted);
        assert_eq!(decoded.content, content);

        let wrong_key = PeerKey::from_bytes([4u8; 32]);
        assert!(matches!(decode_envelope(&envelope, Some(&wrong_key)), Err(PipelineError::Crypto(_))));
    }

    #[test]
    fn missing_key_for_encrypted_envelope_is_a_crypto_error() {
        let content = ClipboardContent::Text { text: "secret".into() };
        let origin = DeviceId::generate();
        let target = DeviceId::generate();
        let key = PeerKey::from_bytes([1u8; 32]);
        let envelope = encode_envelope(&content, &origin, &target, Some(&key)).unwrap();
        assert!(matches!(decode_envelope(&envelope, None), Err(PipelineError::Crypto(_))));
    }
}

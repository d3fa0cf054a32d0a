use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use x25519_dalek::PublicKey;

use hypo_core::errors::{CryptoError, PairingError};
use hypo_core::ids::{DeviceId, PeerKey};
use hypo_core::network::DiscoveredPeer;
use hypo_crypto::{decrypt, encrypt, KxKeyPair, SealedMessage};

use crate::bundle::verify_peer_bundle;
use crate::messages::{AckEnvelope, AckPayload, ChallengeEnvelope, ChallengePayload};
use crate::replay_guard::ReplayGuard;

const PAIR_INFO: &[u8] = b"hypo-pair-v1";
const CHALLENGE_SKEW_SECS: i64 = 30;

#[derive(Debug, Error)]
pub enum PairingSessionError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Pairing(#[from] PairingError),
    #[error("malformed pairing payload: {0}")]
    Malformed(String),
}

fn random_challenge_id() -> String {
    let mut buf = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Initiator-side handle (§4.7 steps 1-3, 6). Holds the ephemeral key pair
/// and derived shared key until the ack arrives or the attempt fails; never
/// persisted.
pub struct InitiatorSession {
    challenge_id: String,
    key: [u8; 32],
    challenge_bytes: [u8; 32],
}

impl InitiatorSession {
    /// Verify the peer's advertised bundle, derive the shared key, and
    /// build the `pairing-challenge` envelope to send.
    pub fn initiate(
        local_device_id: &DeviceId,
        local_device_name: &str,
        peer: &DiscoveredPeer,
        peer_kx_pub: &[u8; 32],
        peer_signing_pub: &[u8; 32],
        now: DateTime<Utc>,
    ) -> Result<(Self, ChallengeEnvelope), PairingSessionError> {
        verify_peer_bundle(peer, peer_kx_pub, peer_signing_pub, now)?;

        let kx = KxKeyPair::generate();
        let peer_pub = PublicKey::from(*peer_kx_pub);
        let key = hypo_crypto::derive(kx.secret(), &peer_pub, PAIR_INFO);

        let mut challenge_bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut challenge_bytes);
        let challenge_id = random_challenge_id();

        let payload = ChallengePayload { challenge: challenge_bytes, timestamp: now };
        let plaintext = serde_json::to_vec(&payload)
            .map_err(|e| PairingSessionError::Malformed(e.to_string()))?;
        let sealed = encrypt(&plaintext, &key, local_device_id.as_str().as_bytes(), None)?;

        let envelope = ChallengeEnvelope {
            challenge_id: challenge_id.clone(),
            initiator_device_id: local_device_id.clone(),
            initiator_name: local_device_name.to_string(),
            initiator_kx_pub: kx.public_bytes(),
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
            tag: sealed.tag,
        };

        Ok((Self { challenge_id, key, challenge_bytes }, envelope))
    }

    /// Decrypt and verify the responder's ack, completing the handshake
    /// (§4.7 step 6). Returns the responder's id and the shared key to
    /// persist in the key store.
    pub fn complete(
        &self,
        ack: &AckEnvelope,
        now: DateTime<Utc>,
    ) -> Result<(DeviceId, PeerKey), PairingSessionError> {
        if ack.challenge_id != self.challenge_id {
            return Err(PairingError::InvalidSig.into());
        }

        let sealed = SealedMessage { ciphertext: ack.ciphertext.clone(), nonce: ack.nonce, tag: ack.tag };
        let plaintext = decrypt(&sealed, &self.key, ack.responder_device_id.as_str().as_bytes())?;
        let payload: AckPayload =
            serde_json::from_slice(&plaintext).map_err(|e| PairingSessionError::Malformed(e.to_string()))?;

        if (now - payload.issued_at).num_seconds().abs() > CHALLENGE_SKEW_SECS {
            return Err(PairingError::TimeSkew.into());
        }

        let expected_hash = Sha256::digest(self.challenge_bytes);
        if expected_hash.as_slice() != payload.challenge_hash {
            return Err(PairingError::InvalidSig.into());
        }

        Ok((ack.responder_device_id.clone(), PeerKey::from_bytes(self.key)))
    }
}

/// Responder-side operations (§4.7 steps 4-5). Stateless across calls aside
/// from the caller-owned [`ReplayGuard`] — a fresh `K` is derived per
/// challenge and handed back for the caller to persist.
pub struct Responder;

impl Responder {
    pub fn handle_challenge(
        local_device_id: &DeviceId,
        local_device_name: &str,
        local_kx: &KxKeyPair,
        envelope: &ChallengeEnvelope,
        replay_guard: &mut ReplayGuard,
        now: DateTime<Utc>,
    ) -> Result<(AckEnvelope, PeerKey), PairingSessionError> {
        if !replay_guard.check_and_insert(&envelope.challenge_id) {
            return Err(PairingError::Replay.into());
        }

        let initiator_pub = PublicKey::from(envelope.initiator_kx_pub);
        let key = hypo_crypto::derive(local_kx.secret(), &initiator_pub, PAIR_INFO);

        let sealed = SealedMessage { ciphertext: envelope.ciphertext.clone(), nonce: envelope.nonce, tag: envelope.tag };
        let plaintext =
            decrypt(&sealed, &key, envelope.initiator_device_id.as_str().as_bytes())?;
        let payload: ChallengePayload =
            serde_json::from_slice(&plaintext).map_err(|e| PairingSessionError::Malformed(e.to_string()))?;

        if (now - payload.timestamp).num_seconds().abs() > CHALLENGE_SKEW_SECS {
            return Err(PairingError::TimeSkew.into());
        }

        let challenge_hash: [u8; 32] = Sha256::digest(payload.challenge).into();
        let ack_payload = AckPayload { challenge_hash, issued_at: now };
        let ack_plain = serde_json::to_vec(&ack_payload)
            .map_err(|e| PairingSessionError::Malformed(e.to_string()))?;
        let sealed_ack = encrypt(&ack_plain, &key, local_device_id.as_str().as_bytes(), None)?;

        let ack = AckEnvelope {
            challenge_id: envelope.challenge_id.clone(),
            responder_device_id: local_device_id.clone(),
            responder_name: local_device_name.to_string(),
            nonce: sealed_ack.nonce,
            ciphertext: sealed_ack.ciphertext,
            tag: sealed_ack.tag,
        };

        Ok((ack, PeerKey::from_bytes(key)))
    }
}

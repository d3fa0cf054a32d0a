use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hypo_core::ids::DeviceId;

/// Wire message sent by the initiator (§4.7 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeEnvelope {
    pub challenge_id: String,
    pub initiator_device_id: DeviceId,
    pub initiator_name: String,
    pub initiator_kx_pub: [u8; 32],
    pub nonce: [u8; hypo_crypto::NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; hypo_crypto::TAG_LEN],
}

/// Wire message sent by the responder (§4.7 step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckEnvelope {
    pub challenge_id: String,
    pub responder_device_id: DeviceId,
    pub responder_name: String,
    pub nonce: [u8; hypo_crypto::NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; hypo_crypto::TAG_LEN],
}

/// Plaintext sealed inside [`ChallengeEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChallengePayload {
    pub challenge: [u8; 32],
    pub timestamp: DateTime<Utc>,
}

/// Plaintext sealed inside [`AckEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AckPayload {
    pub challenge_hash: [u8; 32],
    pub issued_at: DateTime<Utc>,
}

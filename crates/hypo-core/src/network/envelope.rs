use serde::{Deserialize, Serialize};

use crate::ids::{DeviceId, EnvelopeId};

/// Outer envelope message type (§6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Clipboard,
    PairingChallenge,
    PairingAck,
    Ping,
}

/// `encryption` sub-object. Both fields are empty strings iff the envelope
/// was produced in plaintext-debug mode (§8 scenario 6) — never one without
/// the other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    #[serde(with = "crate::network::b64")]
    pub nonce: Vec<u8>,
    #[serde(with = "crate::network::b64")]
    pub tag: Vec<u8>,
}

impl EncryptionMetadata {
    pub fn plaintext() -> Self {
        Self { nonce: Vec::new(), tag: Vec::new() }
    }

    pub fn is_plaintext(&self) -> bool {
        self.nonce.is_empty() && self.tag.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopePayload {
    pub content_type: String,
    #[serde(with = "crate::network::b64")]
    pub ciphertext: Vec<u8>,
    pub device_id: DeviceId,
    pub target: DeviceId,
    pub encryption: EncryptionMetadata,
}

/// The outer wire envelope (§6.1/§6.2): `[u32-be length][this, as JSON]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub id: EnvelopeId,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: EnvelopePayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_match_protocol() {
        let env = SyncEnvelope {
            id: EnvelopeId::new(),
            message_type: MessageType::Clipboard,
            payload: EnvelopePayload {
                content_type: "text".into(),
                ciphertext: vec![1, 2, 3],
                device_id: DeviceId::generate(),
                target: DeviceId::generate(),
                encryption: EncryptionMetadata { nonce: vec![0; 12], tag: vec![0; 16] },
            },
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "clipboard");
        assert!(json["payload"]["ciphertext"].is_string());
        assert!(json["payload"]["encryption"]["nonce"].is_string());
    }

    #[test]
    fn plaintext_mode_round_trips_empty_encryption() {
        let meta = EncryptionMetadata::plaintext();
        assert!(meta.is_plaintext());
        let json = serde_json::to_string(&meta).unwrap();
        let back: EncryptionMetadata = serde_json::from_str(&json).unwrap();
        assert!(back.is_plaintext());
    }

    #[test]
    fn message_type_uses_underscore_wire_names() {
        assert_eq!(serde_json::to_string(&MessageType::PairingChallenge).unwrap(), "\"pairing_challenge\"");
        assert_eq!(serde_json::to_string(&MessageType::PairingAck).unwrap(), "\"pairing_ack\"");
    }
}

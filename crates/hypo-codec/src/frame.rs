use hypo_core::errors::CodecError;
use hypo_core::network::SyncEnvelope;

/// §6.1: `length ≤ 20 * 1024 * 1024`.
pub const MAX_FRAME_LEN: usize = 20 * 1024 * 1024;

/// Serialize `envelope` and prepend its big-endian u32 length (§6.1).
pub fn encode_frame(envelope: &SyncEnvelope) -> Result<Vec<u8>, CodecError> {
    let json = serde_json::to_vec(envelope).map_err(|e| CodecError::Malformed(e.to_string()))?;
    if json.len() > MAX_FRAME_LEN {
        return Err(CodecError::TooLarge { actual: json.len(), limit: MAX_FRAME_LEN });
    }
    let mut out = Vec::with_capacity(4 + json.len());
    out.extend_from_slice(&(json.len() as u32).to_be_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Parse a complete `[len:u32-be][json]` buffer, as delivered whole by a
/// single WebSocket binary message, into a [`SyncEnvelope`].
pub fn decode_frame(buf: &[u8]) -> Result<SyncEnvelope, CodecError> {
    if buf.len() < 4 {
        return Err(CodecError::Malformed("frame shorter than length prefix".into()));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&buf[..4]);
    let declared_len = u32::from_be_bytes(len_bytes) as usize;
    if declared_len > MAX_FRAME_LEN {
        return Err(CodecError::TooLarge { actual: declared_len, limit: MAX_FRAME_LEN });
    }
    let payload = &buf[4..];
    if payload.len() != declared_len {
        return Err(CodecError::Malformed(format!(
            "declared length {declared_len} does not match payload length {}",
            payload.len()
        )));
    }
    serde_json::from_slice(payload).map_err(|e| CodecError::Malformed(e.to_string()))
}

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use hypo_core::clipboard::{AttachmentMeta, ClipboardContent};
use hypo_core::errors::CodecError;

/// §4.3: raw attachment content must be ≤ 10 MiB before encoding.
pub const MAX_RAW_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Below this size gzip's framing overhead outweighs its savings, so the
/// inner payload is shipped uncompressed (resolves the "small payload
/// gzip threshold" open question at 256 B).
pub const GZIP_THRESHOLD_BYTES: usize = 256;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Serialize, Deserialize)]
struct InnerPayload {
    content_type: String,
    data_base64: String,
    metadata: AttachmentMeta,
}

/// Build the inner cleartext JSON (§6.2) and gzip it unless it falls below
/// [`GZIP_THRESHOLD_BYTES`].
pub fn encode_inner(content: &ClipboardContent) -> Result<Vec<u8>, CodecError> {
    if content.raw_len() > MAX_RAW_ATTACHMENT_BYTES {
        return Err(CodecError::TooLarge { actual: content.raw_len(), limit: MAX_RAW_ATTACHMENT_BYTES });
    }

    let metadata = attachment_meta(content);
    let inner = InnerPayload {
        content_type: content.content_type().to_string(),
        data_base64: STANDARD.encode(content.normalized_bytes()),
        metadata,
    };
    let json = serde_json::to_vec(&inner).map_err(|e| CodecError::Malformed(e.to_string()))?;

    if json.len() < GZIP_THRESHOLD_BYTES {
        return Ok(json);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(|e| CodecError::Malformed(e.to_string()))?;
    encoder.finish().map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Inverse of [`encode_inner`]. Detects gzip by magic bytes rather than
/// threading a flag through the envelope — the threshold is an encoder-side
/// optimization, not a protocol feature the decoder needs configured.
pub fn decode_inner(bytes: &[u8]) -> Result<ClipboardContent, CodecError> {
    let json = if bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(|e| CodecError::Malformed(e.to_string()))?;
        out
    } else {
        bytes.to_vec()
    };

    let inner: InnerPayload = serde_json::from_slice(&json).map_err(|e| CodecError::Malformed(e.to_string()))?;
    let data = STANDARD
        .decode(inner.data_base64.as_bytes())
        .map_err(|e| CodecError::Malformed(e.to_string()))?;

    match inner.content_type.as_str() {
        "text" => Ok(ClipboardContent::Text {
            text: String::from_utf8(data).map_err(|e| CodecError::Malformed(e.to_string()))?,
        }),
        "link" => Ok(ClipboardContent::Link {
            url: String::from_utf8(data).map_err(|e| CodecError::Malformed(e.to_string()))?,
        }),
        "image" => Ok(ClipboardContent::Image { meta: inner.metadata, bytes: data }),
        "file" => Ok(ClipboardContent::File { meta: inner.metadata, bytes: data }),
        other => Err(CodecError::UnknownType(other.to_string())),
    }
}

fn attachment_meta(content: &ClipboardContent) -> AttachmentMeta {
    match content {
        ClipboardContent::Text { text } => {
            AttachmentMeta { length: text.len() as u64, mime: "text/plain".into(), filename: None }
        }
        ClipboardContent::Link { url } => {
            AttachmentMeta { length: url.len() as u64, mime: "text/uri-list".into(), filename: None }
        }
        ClipboardContent::Image { meta, .. } | ClipboardContent::File { meta, .. } => meta.clone(),
    }
}

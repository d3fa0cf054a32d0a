use serde::{Deserialize, Serialize};

/// Metadata carried alongside binary clipboard content (images, files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub length: u64,
    pub mime: String,
    pub filename: Option<String>,
}

/// The tagged content variants a clipboard entry can carry.
///
/// At the wire boundary this collapses to a single `content_type` tag plus a
/// single base64 field (see `hypo_core::network::envelope`); adding a
/// variant here only requires a codec update, not a protocol version bump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "content_type", rename_all = "lowercase")]
pub enum ClipboardContent {
    Text { text: String },
    Link { url: String },
    Image { meta: AttachmentMeta, bytes: Vec<u8> },
    File { meta: AttachmentMeta, bytes: Vec<u8> },
}

impl ClipboardContent {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Link { .. } => "link",
            Self::Image { .. } => "image",
            Self::File { .. } => "file",
        }
    }

    /// Raw byte length of the payload this variant carries, used against the
    /// 10 MiB raw-attachment ceiling before encoding.
    pub fn raw_len(&self) -> usize {
        match self {
            Self::Text { text } => text.len(),
            Self::Link { url } => url.len(),
            Self::Image { bytes, .. } | Self::File { bytes, .. } => bytes.len(),
        }
    }

    /// Normalized bytes used for content-identity hashing (duplicate
    /// detection, echo suppression). Normalization strips nothing today but
    /// is the single seam any future whitespace/encoding normalization would
    /// hook into.
    pub fn normalized_bytes(&self) -> Vec<u8> {
        match self {
            Self::Text { text } => text.as_bytes().to_vec(),
            Self::Link { url } => url.as_bytes().to_vec(),
            Self::Image { bytes, .. } | Self::File { bytes, .. } => bytes.clone(),
        }
    }

    /// Deterministically derive the ≤200-char preview string for this
    /// content. Two entries with byte-identical normalized content always
    /// produce byte-identical previews.
    pub fn preview(&self) -> String {
        const MAX: usize = 200;
        let raw = match self {
            Self::Text { text } => text.clone(),
            Self::Link { url } => url.clone(),
            Self::Image { meta, .. } => format!("[image: {}, {} bytes]", meta.mime, meta.length),
            Self::File { meta, .. } => format!(
                "[file: {}, {} bytes]",
                meta.filename.as_deref().unwrap_or("unnamed"),
                meta.length
            ),
        };
        truncate_chars(&raw, MAX)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_to_200_chars() {
        let content = ClipboardContent::Text { text: "x".repeat(500) };
        assert_eq!(content.preview().chars().count(), 200);
    }

    #[test]
    fn preview_is_deterministic_for_identical_content() {
        let a = ClipboardContent::Text { text: "Hello, Hypo!".into() };
        let b = ClipboardContent::Text { text: "Hello, Hypo!".into() };
        assert_eq!(a.preview(), b.preview());
    }

    #[test]
    fn content_type_tags_match_wire_vocabulary() {
        assert_eq!(ClipboardContent::Text { text: String::new() }.content_type(), "text");
        assert_eq!(ClipboardContent::Link { url: String::new() }.content_type(), "link");
    }
}

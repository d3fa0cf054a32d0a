use thiserror::Error;

/// Failures decoding a wire frame into a [`crate::network::SyncEnvelope`] (§7).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("frame of {actual} bytes exceeds the {limit} byte ceiling")]
    TooLarge { actual: usize, limit: usize },

    #[error("unknown message type: {0}")]
    UnknownType(String),
}

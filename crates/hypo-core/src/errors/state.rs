use thiserror::Error;

/// Failures from the sync coordinator's domain logic (§7).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no key material for peer")]
    MissingKey,

    #[error("unknown peer")]
    UnknownPeer,

    #[error("target device set is empty")]
    TargetEmpty,

    #[error("preferences I/O failure: {0}")]
    Io(String),
}

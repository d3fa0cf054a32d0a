use thiserror::Error;

/// Failures from the pairing handshake (§4.7, §7).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("pairing code expired")]
    CodeExpired,

    #[error("pairing code not found")]
    CodeNotFound,

    #[error("pairing code already claimed")]
    CodeClaimed,

    #[error("replayed pairing message rejected")]
    Replay,

    #[error("peer clock skew exceeds tolerance")]
    TimeSkew,

    #[error("invalid signature")]
    InvalidSig,
}

use thiserror::Error;

/// Failures from the LAN and cloud transports (§7).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("not connected to peer")]
    NotConnected,

    #[error("send timed out")]
    SendTimeout,

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("certificate pinning failed: {0}")]
    PinningFailure(String),

    #[error("connection idle-closed")]
    IdleClose,
}

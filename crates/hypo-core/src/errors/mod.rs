//! The typed error taxonomy (§7). Leaf crates return these; `hypo-sync` and
//! the facade crate wrap them in `anyhow::Error` once there's no more
//! structured recovery to do with the specific variant.

mod codec;
mod crypto;
mod pairing;
mod state;
mod transport;

pub use codec::CodecError;
pub use crypto::CryptoError;
pub use pairing::PairingError;
pub use state::StateError;
pub use transport::TransportError;

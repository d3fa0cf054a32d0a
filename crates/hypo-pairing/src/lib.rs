//! # hypo-pairing
//!
//! The challenge/response key-agreement protocol run once per new peer
//! (§4.7). Both LAN auto-pairing and code-based relay pairing share the
//! same cryptographic steps; only the transport that carries the two
//! envelopes differs, and that transport lives outside this crate.

mod bundle;
mod messages;
mod replay_guard;
mod session;

pub use bundle::{bundle_message, verify_peer_bundle};
pub use messages::{AckEnvelope, ChallengeEnvelope};
pub use replay_guard::ReplayGuard;
pub use session::{InitiatorSession, PairingSessionError, Responder};

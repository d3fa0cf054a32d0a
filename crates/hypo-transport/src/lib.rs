//! # hypo-transport
//!
//! The two wire transports a peer can be reached over (§4.5/§4.6) plus the
//! [`TransportManager`] that fans a send out across both and tracks which
//! one last worked (§4.8). Discovery (`hypo-discovery`) and pairing
//! (`hypo-pairing`) hand this crate peers and keys; it only moves framed
//! envelopes.

mod cloud;
mod lan;
mod manager;
mod pinning;
mod queue;
mod server;

pub use cloud::{CloudClient, CloudConfig, CloudState};
pub use lan::{LanConnection, LanConfig, LanState};
pub use manager::{PeerReachability, SendOutcome, TransportManager};
pub use pinning::FingerprintVerifier;
pub use queue::OutboundQueue;
pub use server::{drain_inbound, InboundFrame, LanServer};

pub use hypo_core::network::TransportKind;

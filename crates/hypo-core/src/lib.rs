//! # hypo-core
//!
//! Domain models, port traits, and the error taxonomy shared by every other
//! `hypo-*` crate. This crate contains no I/O and no crypto implementation —
//! it only describes the shapes that flow between components and the
//! interfaces (`ports`) infrastructure crates implement.

pub mod clipboard;
pub mod device;
pub mod errors;
pub mod ids;
pub mod network;
pub mod ports;
pub mod preferences;

pub use clipboard::{ClipboardContent, ClipboardEntry, TransportOrigin};
pub use device::{PairedDevice, Platform};
pub use ids::{DeviceId, PeerKey};
pub use network::{DiscoveredPeer, SyncEnvelope};
pub use preferences::Preferences;

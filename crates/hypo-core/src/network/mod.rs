pub mod b64;
mod discovered_peer;
mod envelope;
mod events;

pub use discovered_peer::DiscoveredPeer;
pub use envelope::{EncryptionMetadata, EnvelopePayload, MessageType, SyncEnvelope};
pub use events::{DiscoveryEvent, TransportEvent, TransportKind};

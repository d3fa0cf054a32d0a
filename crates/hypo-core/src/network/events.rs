use crate::network::DiscoveredPeer;
use crate::ids::DeviceId;

/// Events emitted by the discovery port as peers appear and disappear on the
/// LAN (§4.4). `Removed` fires both on explicit mDNS goodbye and on
/// staleness pruning — callers don't need to distinguish the two.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    Added(DiscoveredPeer),
    Updated(DiscoveredPeer),
    Removed(DeviceId),
}

/// Which physical path a transport event travelled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Lan,
    Cloud,
}

/// Connection-lifecycle events observable on a transport (§4.6, §4.8).
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected { peer: DeviceId, kind: TransportKind },
    Disconnected { peer: DeviceId, kind: TransportKind, reason: String },
    HandshakeFailed { peer: DeviceId, kind: TransportKind, reason: String },
    PinningFailed { kind: TransportKind, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_event_carries_only_device_id() {
        let id = DeviceId::generate();
        let ev = DiscoveryEvent::Removed(id.clone());
        match ev {
            DiscoveryEvent::Removed(removed) => assert_eq!(removed, id),
            _ => panic!("expected Removed"),
        }
    }
}

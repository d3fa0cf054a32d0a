use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::Platform;
use crate::ids::DeviceId;

/// A peer found on the LAN via mDNS/DNS-SD, before any pairing state is
/// known about it (§3, §4.4). Carries exactly the TXT-record attributes the
/// discovery service publishes plus the metadata needed to dial it.
///
/// `bundle_signature_b64` is the advertiser's Ed25519 signature (over
/// `kx_pub_b64 || signing_pub_b64 || issued_at`, signed with the private
/// half of `signing_pub_b64`) that `hypo_pairing::verify_peer_bundle`
/// checks before pairing proceeds (§4.7 step 1). It proves the advertiser
/// holds the signing key it published and that the bundle hasn't been
/// altered or replayed past `issued_at`; it does not, by itself, prove the
/// advertiser is who it claims to be on first contact — that's a
/// trust-on-first-use property inherent to unauthenticated LAN discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPeer {
    pub device_id: DeviceId,
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub fingerprint_sha256: String,
    pub kx_pub_b64: String,
    pub signing_pub_b64: String,
    pub issued_at: DateTime<Utc>,
    pub bundle_signature_b64: String,
    pub platform: Platform,
    pub protocol_version: String,
    pub last_seen: DateTime<Utc>,
}

impl DiscoveredPeer {
    /// A peer not refreshed within this window is considered stale and
    /// pruned from the discovery cache (§4.4).
    pub const STALE_AFTER_SECS: i64 = 5 * 60;

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_seen).num_seconds() > Self::STALE_AFTER_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(last_seen: DateTime<Utc>) -> DiscoveredPeer {
        DiscoveredPeer {
            device_id: DeviceId::generate(),
            service_name: "hypo-abc123._hypo._tcp.local.".into(),
            host: "192.168.1.42".into(),
            port: 54321,
            fingerprint_sha256: "deadbeef".into(),
            kx_pub_b64: String::new(),
            signing_pub_b64: String::new(),
            issued_at: last_seen,
            bundle_signature_b64: String::new(),
            platform: Platform::MacOS,
            protocol_version: "1".into(),
            last_seen,
        }
    }

    #[test]
    fn fresh_peer_is_not_stale() {
        assert!(!peer(Utc::now()).is_stale(Utc::now()));
    }

    #[test]
    fn peer_past_window_is_stale() {
        let seen = Utc::now() - chrono::Duration::seconds(DiscoveredPeer::STALE_AFTER_SECS + 1);
        assert!(peer(seen).is_stale(Utc::now()));
    }
}

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};

use hypo_core::errors::PairingError;
use hypo_core::network::DiscoveredPeer;
use hypo_crypto::identity_fingerprint;

/// How old an advertisement may be before its key bundle is no longer
/// trusted for pairing (§4.7 step 1). Separate from, but equal to, the
/// discovery staleness window — pairing re-checks freshness itself rather
/// than trusting that the caller only hands it live peers.
const BUNDLE_FRESHNESS_SECS: i64 = 5 * 60;

/// The exact bytes an advertiser signs (and a verifier re-derives) to bind
/// a key bundle to a point in time: the X25519 key, the Ed25519 key, and
/// the Unix timestamp, concatenated with no delimiter (all fixed-width).
pub fn bundle_message(kx_pub: &[u8; 32], signing_pub: &[u8; 32], issued_at_unix: i64) -> Vec<u8> {
    let mut message = Vec::with_capacity(32 + 32 + 8);
    message.extend_from_slice(kx_pub);
    message.extend_from_slice(signing_pub);
    message.extend_from_slice(&issued_at_unix.to_be_bytes());
    message
}

/// Verify a discovered peer's key bundle before starting a pairing attempt
/// (§4.7 step 1: "A verifies B's static signing key has signed the
/// advertised key bundle with timestamp ≤ 5 min old").
///
/// Three checks, all against the caller-supplied `kx_pub`/`signing_pub` —
/// the keys the initiator actually intends to pair against, not whatever
/// the peer happens to claim right now:
/// 1. The published fingerprint is the hash of that exact key pair.
/// 2. `peer.bundle_signature_b64` is a valid Ed25519 signature over
///    [`bundle_message`] under `signing_pub`, proving the advertiser holds
///    the private half of the signing key it published and that the
///    bundle hasn't been altered.
/// 3. `peer.issued_at` — the signed timestamp, not the locally-stamped
///    `last_seen` — is within the freshness window, so a captured
///    advertisement can't be replayed indefinitely.
///
/// This is proof-of-possession and replay resistance, not third-party
/// authentication: nothing here prevents an attacker from generating its
/// own key pair and advertising itself as a never-before-seen device. That
/// first-contact trust gap is inherent to unauthenticated LAN discovery
/// (the same trust-on-first-use model SSH host keys use) and is accepted
/// here rather than solved; see SPEC_FULL.md §3.
pub fn verify_peer_bundle(
    peer: &DiscoveredPeer,
    kx_pub: &[u8; 32],
    signing_pub: &[u8; 32],
    now: DateTime<Utc>,
) -> Result<(), PairingError> {
    let expected = identity_fingerprint(kx_pub, signing_pub);
    if expected != peer.fingerprint_sha256 {
        return Err(PairingError::InvalidSig);
    }

    let sig_bytes = BASE64.decode(&peer.bundle_signature_b64).map_err(|_| PairingError::InvalidSig)?;
    let sig: [u8; 64] = sig_bytes.try_into().map_err(|_| PairingError::InvalidSig)?;
    let message = bundle_message(kx_pub, signing_pub, peer.issued_at.timestamp());
    let valid = hypo_crypto::verify_signature(signing_pub, &message, &sig).map_err(|_| PairingError::InvalidSig)?;
    if !valid {
        return Err(PairingError::InvalidSig);
    }

    if (now - peer.issued_at).num_seconds().abs() > BUNDLE_FRESHNESS_SECS {
        return Err(PairingError::TimeSkew);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypo_core::device::Platform;
    use hypo_core::ids::DeviceId;
    use hypo_crypto::IdentityKeyPair;

    fn peer(
        kx_pub: &[u8; 32],
        signing_key: &IdentityKeyPair,
        fingerprint: String,
        issued_at: DateTime<Utc>,
        last_seen: DateTime<Utc>,
    ) -> DiscoveredPeer {
        let signing_pub = signing_key.verifying_bytes();
        let message = bundle_message(kx_pub, &signing_pub, issued_at.timestamp());
        let signature = signing_key.sign(&message);
        DiscoveredPeer {
            device_id: DeviceId::generate(),
            service_name: "hypo-abc._hypo._tcp.local.".into(),
            host: "192.168.1.10".into(),
            port: 9000,
            fingerprint_sha256: fingerprint,
            kx_pub_b64: BASE64.encode(kx_pub),
            signing_pub_b64: BASE64.encode(signing_pub),
            issued_at,
            bundle_signature_b64: BASE64.encode(signature),
            platform: Platform::Linux,
            protocol_version: "1".into(),
            last_seen,
        }
    }

    #[test]
    fn matching_fresh_signed_bundle_is_accepted() {
        let kx_pub = [1u8; 32];
        let signing_key = IdentityKeyPair::generate();
        let signing_pub = signing_key.verifying_bytes();
        let fp = identity_fingerprint(&kx_pub, &signing_pub);
        let now = Utc::now();
        let p = peer(&kx_pub, &signing_key, fp, now, now);
        assert!(verify_peer_bundle(&p, &kx_pub, &signing_pub, now).is_ok());
    }

    #[test]
    fn mismatched_fingerprint_is_rejected() {
        let kx_pub = [1u8; 32];
        let signing_key = IdentityKeyPair::generate();
        let signing_pub = signing_key.verifying_bytes();
        let now = Utc::now();
        let mut p = peer(&kx_pub, &signing_key, "not-the-real-hash".into(), now, now);
        p.fingerprint_sha256 = "not-the-real-hash".into();
        assert_eq!(
            verify_peer_bundle(&p, &kx_pub, &signing_pub, now),
            Err(PairingError::InvalidSig)
        );
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let kx_pub = [1u8; 32];
        let signing_key = IdentityKeyPair::generate();
        let signing_pub = signing_key.verifying_bytes();
        let fp = identity_fingerprint(&kx_pub, &signing_pub);
        let now = Utc::now();
        let mut p = peer(&kx_pub, &signing_key, fp, now, now);
        p.bundle_signature_b64 = BASE64.encode([0u8; 64]);
        assert_eq!(
            verify_peer_bundle(&p, &kx_pub, &signing_pub, now),
            Err(PairingError::InvalidSig)
        );
    }

    #[test]
    fn bundle_signed_by_a_different_key_is_rejected() {
        let kx_pub = [1u8; 32];
        let signing_key = IdentityKeyPair::generate();
        let impostor_key = IdentityKeyPair::generate();
        let signing_pub = signing_key.verifying_bytes();
        let fp = identity_fingerprint(&kx_pub, &signing_pub);
        let now = Utc::now();
        // Signed by a key other than the one whose fingerprint/pub bytes
        // are advertised — a forged advertisement from an attacker who
        // doesn't hold the real signing private key.
        let p = peer(&kx_pub, &impostor_key, fp, now, now);
        assert_eq!(
            verify_peer_bundle(&p, &kx_pub, &signing_pub, now),
            Err(PairingError::InvalidSig)
        );
    }

    #[test]
    fn stale_bundle_is_rejected() {
        let kx_pub = [1u8; 32];
        let signing_key = IdentityKeyPair::generate();
        let signing_pub = signing_key.verifying_bytes();
        let fp = identity_fingerprint(&kx_pub, &signing_pub);
        let stale = Utc::now() - chrono::Duration::seconds(BUNDLE_FRESHNESS_SECS + 30);
        let p = peer(&kx_pub, &signing_key, fp, stale, stale);
        assert_eq!(
            verify_peer_bundle(&p, &kx_pub, &signing_pub, Utc::now()),
            Err(PairingError::TimeSkew)
        );
    }
}

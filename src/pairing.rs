use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use hypo_core::device::Platform;
use hypo_core::ids::{DeviceId, PeerKey};
use hypo_core::network::DiscoveredPeer;
use hypo_pairing::{AckEnvelope, ChallengeEnvelope, InitiatorSession, PairingSessionError, Responder};

use crate::identity::LocalIdentity;

/// Owns the initiator-side pending-session table and the responder-side
/// replay guard (§4.7). Both sides of a handshake funnel through here so
/// the facade's callers never touch `hypo-pairing` session state directly.
pub struct PairingCoordinator {
    pending: Mutex<HashMap<String, InitiatorSession>>,
    replay_guard: Mutex<hypo_pairing::ReplayGuard>,
}

impl PairingCoordinator {
    pub fn new() -> Self {
        Self { pending: Mutex::new(HashMap::new()), replay_guard: Mutex::new(hypo_pairing::ReplayGuard::bounded()) }
    }

    /// Begin pairing with a peer discovered on the LAN (§4.7 steps 1-3).
    pub fn begin(
        &self,
        identity: &LocalIdentity,
        local_name: &str,
        peer: &DiscoveredPeer,
        peer_kx_pub: [u8; 32],
        peer_signing_pub: [u8; 32],
    ) -> Result<ChallengeEnvelope, PairingSessionError> {
        let (session, envelope) =
            InitiatorSession::initiate(&identity.device_id, local_name, peer, &peer_kx_pub, &peer_signing_pub, Utc::now())?;
        self.pending.lock().unwrap().insert(envelope.challenge_id.clone(), session);
        Ok(envelope)
    }

    /// Finish pairing after the responder's ack arrives (§4.7 step 6).
    /// Returns the peer's id and the shared key, ready to hand to
    /// `KeyStorePort::store` and `PairedDeviceRepositoryPort::upsert`.
    pub fn complete(&self, ack: &AckEnvelope) -> Result<(DeviceId, PeerKey), PairingSessionError> {
        let session = self
            .pending
            .lock()
            .unwrap()
            .remove(&ack.challenge_id)
            .ok_or(PairingSessionError::from(hypo_core::errors::PairingError::CodeNotFound))?;
        session.complete(ack, Utc::now())
    }

    /// Respond to an incoming challenge (§4.7 steps 4-5). Returns the ack to
    /// send back and the shared key, ready to persist immediately — the
    /// responder side has no further round trip.
    pub fn handle_challenge(
        &self,
        identity: &LocalIdentity,
        local_name: &str,
        envelope: &ChallengeEnvelope,
    ) -> Result<(AckEnvelope, PeerKey), PairingSessionError> {
        let mut guard = self.replay_guard.lock().unwrap();
        Responder::handle_challenge(&identity.device_id, local_name, &identity.kx, envelope, &mut guard, Utc::now())
    }
}

impl Default for PairingCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn local_platform() -> Platform {
    if cfg!(target_os = "macos") {
        Platform::MacOS
    } else if cfg!(target_os = "windows") {
        Platform::Windows
    } else if cfg!(target_os = "linux") {
        Platform::Linux
    } else {
        Platform::Unknown
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::Platform;
use crate::ids::DeviceId;

/// Which transport last successfully delivered an envelope to this peer.
/// Updated by the transport manager, persisted in the preferences file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastSuccessfulTransport {
    Lan,
    Cloud,
    None,
}

impl Default for LastSuccessfulTransport {
    fn default() -> Self {
        Self::None
    }
}

/// A device this install has completed pairing with.
///
/// Created on successful pairing, updated by the transport manager as
/// connectivity changes, destroyed (along with its [`PeerKey`](crate::ids::PeerKey))
/// when the user unpairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedDevice {
    pub device_id: DeviceId,
    pub name: String,
    pub platform: Platform,
    pub last_seen: DateTime<Utc>,
    pub last_successful_transport: LastSuccessfulTransport,
}

impl PairedDevice {
    pub fn new(device_id: DeviceId, name: impl Into<String>, platform: Platform) -> Self {
        Self {
            device_id,
            name: name.into(),
            platform,
            last_seen: Utc::now(),
            last_successful_transport: LastSuccessfulTransport::None,
        }
    }
}

use serde::{Deserialize, Serialize};

/// User settings namespace of §6.5's preferences file (namespace b, minus
/// paired-device metadata which lives in [`crate::device::PairedDevice`]
/// via [`crate::ports::PairedDeviceRepositoryPort`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub history_size_limit: u32,
    pub auto_delete_interval_secs: u64,
    pub plaintext_debug: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { history_size_limit: 500, auto_delete_interval_secs: 30 * 24 * 3600, plaintext_debug: false }
    }
}

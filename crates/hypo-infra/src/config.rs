use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

/// Process-wide configuration (§6 ambient stack), layered TOML over
/// environment overrides the way the teacher layers its per-feature
/// config structs through the `config` crate.
///
/// Precedence, lowest to highest: compiled-in defaults, the TOML file at
/// the given path (if present), then `HYPO_*` environment variables
/// (e.g. `HYPO_RELAY_URL`, `HYPO_DEDUP_WINDOW_SECS`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HypoConfig {
    pub service_name: String,
    pub relay_url: String,
    pub pinned_cert_fingerprint: Option<String>,
    pub history_size_limit: u32,
    pub auto_delete_interval_secs: u64,
    pub plaintext_debug: bool,
    pub dedup_window_secs: u64,
    pub lan_bind_addr: String,
}

impl Default for HypoConfig {
    fn default() -> Self {
        Self {
            service_name: "_hypo._tcp.local.".to_string(),
            relay_url: "wss://relay.hypo.example".to_string(),
            pinned_cert_fingerprint: None,
            history_size_limit: 500,
            auto_delete_interval_secs: 30 * 24 * 3600,
            plaintext_debug: false,
            dedup_window_secs: 5,
            lan_bind_addr: "0.0.0.0:0".to_string(),
        }
    }
}

impl HypoConfig {
    /// Load from an optional TOML file plus `HYPO_*` environment overrides.
    /// A missing file is not an error — defaults still apply.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = Config::builder()
            .set_default("service_name", defaults.service_name)?
            .set_default("relay_url", defaults.relay_url)?
            .set_default("history_size_limit", defaults.history_size_limit)?
            .set_default("auto_delete_interval_secs", defaults.auto_delete_interval_secs)?
            .set_default("plaintext_debug", defaults.plaintext_debug)?
            .set_default("dedup_window_secs", defaults.dedup_window_secs)?
            .set_default("lan_bind_addr", defaults.lan_bind_addr)?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("HYPO"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = HypoConfig::load("/nonexistent/hypo-config-test.toml").unwrap();
        assert_eq!(cfg.service_name, HypoConfig::default().service_name);
        assert_eq!(cfg.dedup_window_secs, 5);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = std::env::temp_dir().join(format!("hypo-config-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "relay_url = \"wss://custom.example\"\ndedup_window_secs = 10\n").unwrap();

        let cfg = HypoConfig::load(&path).unwrap();
        assert_eq!(cfg.relay_url, "wss://custom.example");
        assert_eq!(cfg.dedup_window_secs, 10);

        std::fs::remove_dir_all(&dir).ok();
    }
}

//! # hypo-infra
//!
//! Ambient persistence and configuration for the Hypo sync engine: the
//! preferences file (§6.5 namespace b) and process configuration (§6
//! ambient stack). Secret material never passes through this crate — that
//! namespace belongs to `hypo-keystore` exclusively.

mod config;
mod paired_devices;
mod preferences;

pub use config::HypoConfig;
pub use paired_devices::FilePairedDeviceRepository;
pub use preferences::FilePreferencesRepository;

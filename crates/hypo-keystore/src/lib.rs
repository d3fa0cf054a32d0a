//! # hypo-keystore
//!
//! `KeyStorePort` (§4.2) backed by the host's secret facility, with a
//! file-based fallback for platforms where that facility is unavailable
//! (headless Linux, WSL). Backend selection mirrors the platform's own
//! capability-detection pass and is transparent to callers.

mod capability;
mod file_store;
mod index;
mod platform_store;
mod system_store;

pub use capability::{detect_storage_capability, SecureStorageCapability};
pub use file_store::FileKeyStore;
pub use platform_store::PlatformKeyStore;
pub use system_store::SystemKeyStore;

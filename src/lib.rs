//! # hypo
//!
//! The assembled Hypo sync engine: wires `hypo-core`'s ports to the
//! `hypo-crypto`/`hypo-keystore`/`hypo-codec`/`hypo-discovery`/
//! `hypo-pairing`/`hypo-transport`/`hypo-sync`/`hypo-infra` crates behind a
//! single [`HypoCore`] handle. A host application supplies the platform
//! clipboard, notifications, and durable history via [`HypoCoreBuilder`];
//! everything else is internal.

mod builder;
mod facade;
mod identity;
mod pairing;

pub use builder::HypoCoreBuilder;
pub use facade::HypoCore;
pub use identity::LocalIdentity;
pub use pairing::PairingCoordinator;

/// Installs a `tracing-subscriber` `fmt` layer honoring `RUST_LOG`,
/// defaulting to `info` for this crate's own spans. Host applications that
/// already run their own subscriber should skip this and register the
/// crate's spans with their own.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

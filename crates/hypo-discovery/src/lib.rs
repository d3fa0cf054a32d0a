//! # hypo-discovery
//!
//! Advertises and browses the `_hypo._tcp.` DNS-SD service type (§4.4).
//! `mdns-sd` provides the actual multicast implementation; this crate adds
//! the per-run state machine, backoff-on-failure registration, and
//! staleness pruning the specification requires on top of it.

mod backoff;
mod browser;
mod net_utils;
mod registrar;
mod state;

pub use backoff::BackoffSchedule;
pub use browser::PeerBrowser;
pub use net_utils::get_physical_lan_ip;
pub use registrar::{AdvertiseInfo, Registrar};
pub use state::DiscoveryState;

pub use hypo_core::network::DiscoveryEvent;

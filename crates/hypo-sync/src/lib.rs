//! # hypo-sync
//!
//! The sync pipeline: [`SyncCoordinator`] owns the outbound fan-out,
//! dedup, and echo suppression (§4.9); [`IncomingHandler`] turns a wire
//! frame back into a [`hypo_core::clipboard::ClipboardEntry`] and hands it
//! to the coordinator (§4.10); [`Metrics`] accumulates the in-process
//! counters and duration samples the host reads (§4.11).

mod coordinator;
mod echo_window;
mod incoming;
mod metrics;

pub use coordinator::{SyncCoordinator, SyncError};
pub use incoming::IncomingHandler;
pub use metrics::{Metrics, SendOutcomeKind};

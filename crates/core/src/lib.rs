//! Leaderboard domain core.
//!
//! Pure aggregation and time-window logic plus the storage ports the rest of
//! the workspace codes against. This crate has zero internal deps so it can
//! be shared by the database adapters, the realtime plumbing, the display
//! runtime and the HTTP server alike.
//!
//! - [`scoring`]: per-hole rows to ranked per-player totals.
//! - [`time_filter`]: symbolic time windows and their cutoffs.
//! - [`snapshot`] / [`changes`]: shape validation of untrusted payloads.
//! - [`snapshot_store`]: the cached leaderboard service.
//! - [`rotation`]: the drift-resistant interval clock behind every rotation timer.

pub mod board;
pub mod changes;
pub mod error;
pub mod memory;
pub mod pending_writes;
pub mod ports;
pub mod rotation;
pub mod scoring;
pub mod snapshot;
pub mod snapshot_store;
pub mod time_filter;
pub mod types;

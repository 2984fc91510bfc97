//! Display WebSocket.
//!
//! Each connection subscribes to the change bus and receives every
//! validated snapshot change as a JSON text frame, optionally narrowed to
//! one event and filter.

mod handler;

pub use handler::{snapshot_frame, ws_handler, WsQuery, HEARTBEAT_INTERVAL};

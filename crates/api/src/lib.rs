//! Leaderboard API server library.
//!
//! Exposes config, state, error handling, routes and the display WebSocket
//! so integration tests and the binary entrypoint can both build the app.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;

//! Row structs for the leaderboard tables.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus any insert DTO and the conversion into the core
//! domain type.

pub mod event;
pub mod score;
pub mod snapshot;

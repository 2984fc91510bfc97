//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod event_repo;
pub mod score_repo;
pub mod snapshot_repo;

pub use event_repo::EventRepo;
pub use score_repo::ScoreRepo;
pub use snapshot_repo::SnapshotRepo;

//! Storage and query ports the engine depends on.
//!
//! The database crate implements these against PostgreSQL; [`crate::memory`]
//! implements them in process for tests and offline use.

use async_trait::async_trait;

use crate::board::EventMeta;
use crate::error::CoreError;
use crate::pending_writes::PendingScoreWrite;
use crate::scoring::{PlayerHoleScore, PlayerTotalScore};
use crate::snapshot::StoredSnapshot;
use crate::time_filter::TimeFilter;
use crate::types::{EventId, Timestamp};

/// Which raw rows to load for one aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreQuery {
    pub event_id: EventId,
    /// Inclusive lower bound on `created_at`; `None` loads everything.
    pub since: Option<Timestamp>,
    pub published_only: bool,
}

#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn list_scores(&self, query: &ScoreQuery) -> Result<Vec<PlayerHoleScore>, CoreError>;
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn get_snapshot(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<Option<StoredSnapshot>, CoreError>;

    /// Replace the whole row for the key in one write.
    async fn upsert_snapshot(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
        scores: &[PlayerTotalScore],
        updated_at: Timestamp,
    ) -> Result<(), CoreError>;
}

#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn find_event(&self, event_id: EventId) -> Result<Option<EventMeta>, CoreError>;

    /// Events eligible for the main leaderboard.
    async fn list_events(&self) -> Result<Vec<EventMeta>, CoreError>;
}

#[async_trait]
pub trait ScoreWriter: Send + Sync {
    /// Persist one score. Writing the same `client_id` twice must be a no-op.
    async fn write_score(&self, write: &PendingScoreWrite) -> Result<(), CoreError>;
}

/// Read side used by realtime subscribers.
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// `Ok(None)` when no valid snapshot exists.
    async fn fetch(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<Option<Vec<PlayerTotalScore>>, CoreError>;
}

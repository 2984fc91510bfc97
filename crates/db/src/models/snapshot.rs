//! Leaderboard snapshot model.

use leaderboard_core::snapshot::StoredSnapshot;
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::{EventId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `leaderboard_snapshots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SnapshotRow {
    pub id: i64,
    pub event_id: EventId,
    pub time_filter: String,
    pub scores: serde_json::Value,
    pub updated_at: Timestamp,
}

impl SnapshotRow {
    /// Payload is left unvalidated; callers run it through the snapshot check.
    pub fn into_stored(self, time_filter: TimeFilter) -> StoredSnapshot {
        StoredSnapshot {
            event_id: self.event_id,
            time_filter,
            payload: self.scores,
            updated_at: self.updated_at,
        }
    }
}

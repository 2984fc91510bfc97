//! Repository for the `leaderboard_snapshots` table.

use leaderboard_core::types::{EventId, Timestamp};
use sqlx::PgPool;

use crate::models::snapshot::SnapshotRow;

/// Column list for `leaderboard_snapshots` queries.
const COLUMNS: &str = "id, event_id, time_filter, scores, updated_at";

pub struct SnapshotRepo;

impl SnapshotRepo {
    pub async fn find(
        pool: &PgPool,
        event_id: EventId,
        time_filter: &str,
    ) -> Result<Option<SnapshotRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM leaderboard_snapshots WHERE event_id = $1 AND time_filter = $2"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(event_id)
            .bind(time_filter)
            .fetch_optional(pool)
            .await
    }

    /// Replace the snapshot for the key in a single statement.
    pub async fn upsert(
        pool: &PgPool,
        event_id: EventId,
        time_filter: &str,
        scores: &serde_json::Value,
        updated_at: Timestamp,
    ) -> Result<SnapshotRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO leaderboard_snapshots (event_id, time_filter, scores, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (event_id, time_filter) DO UPDATE SET \
                scores = EXCLUDED.scores, \
                updated_at = EXCLUDED.updated_at \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(event_id)
            .bind(time_filter)
            .bind(scores)
            .bind(updated_at)
            .fetch_one(pool)
            .await
    }
}

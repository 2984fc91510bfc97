//! PostgreSQL implementation of the core storage ports.

use async_trait::async_trait;
use leaderboard_core::board::EventMeta;
use leaderboard_core::error::CoreError;
use leaderboard_core::pending_writes::PendingScoreWrite;
use leaderboard_core::ports::{
    EventCatalog, ScoreQuery, ScoreSource, ScoreWriter, SnapshotRepository,
};
use leaderboard_core::scoring::{PlayerHoleScore, PlayerTotalScore};
use leaderboard_core::snapshot::StoredSnapshot;
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::{EventId, Timestamp};

use crate::models::score::CreateScore;
use crate::repositories::{EventRepo, ScoreRepo, SnapshotRepo};
use crate::DbPool;

#[derive(Clone)]
pub struct PgLeaderboardStore {
    pool: DbPool,
}

impl PgLeaderboardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn source(e: sqlx::Error) -> CoreError {
    CoreError::Source(e.to_string())
}

#[async_trait]
impl ScoreSource for PgLeaderboardStore {
    async fn list_scores(&self, query: &ScoreQuery) -> Result<Vec<PlayerHoleScore>, CoreError> {
        let rows =
            ScoreRepo::list_for_event(&self.pool, query.event_id, query.since, query.published_only)
                .await
                .map_err(source)?;
        Ok(rows.into_iter().map(PlayerHoleScore::from).collect())
    }
}

#[async_trait]
impl SnapshotRepository for PgLeaderboardStore {
    async fn get_snapshot(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<Option<StoredSnapshot>, CoreError> {
        let row = SnapshotRepo::find(&self.pool, event_id, time_filter.as_str())
            .await
            .map_err(source)?;
        Ok(row.map(|r| r.into_stored(time_filter)))
    }

    async fn upsert_snapshot(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
        scores: &[PlayerTotalScore],
        updated_at: Timestamp,
    ) -> Result<(), CoreError> {
        let payload =
            serde_json::to_value(scores).map_err(|e| CoreError::Internal(e.to_string()))?;
        SnapshotRepo::upsert(&self.pool, event_id, time_filter.as_str(), &payload, updated_at)
            .await
            .map_err(source)?;
        Ok(())
    }
}

#[async_trait]
impl EventCatalog for PgLeaderboardStore {
    async fn find_event(&self, event_id: EventId) -> Result<Option<EventMeta>, CoreError> {
        let row = EventRepo::find_by_id(&self.pool, event_id)
            .await
            .map_err(source)?;
        Ok(row.map(|r| r.into_meta()))
    }

    async fn list_events(&self) -> Result<Vec<EventMeta>, CoreError> {
        let rows = EventRepo::list_leaderboard_events(&self.pool)
            .await
            .map_err(source)?;
        Ok(rows.into_iter().map(|r| r.into_meta()).collect())
    }
}

#[async_trait]
impl ScoreWriter for PgLeaderboardStore {
    async fn write_score(&self, write: &PendingScoreWrite) -> Result<(), CoreError> {
        let input = CreateScore {
            client_id: Some(write.client_id),
            event_id: write.event_id,
            player_id: write.player_id.clone(),
            name: write.name.clone(),
            hole_number: write.hole_number,
            score: write.score,
            is_published: true,
            created_at: Some(write.recorded_at),
        };

        let inserted = ScoreRepo::insert_idempotent(&self.pool, &input)
            .await
            .map_err(source)?;
        if inserted.is_none() {
            tracing::debug!(client_id = %write.client_id, "Score write already applied");
        }
        Ok(())
    }
}

//! Snapshot store service: read validated snapshots, recompute and persist
//! them from raw score rows.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, Offset, Utc};

use crate::board::EventMeta;
use crate::error::CoreError;
use crate::ports::{EventCatalog, ScoreQuery, ScoreSource, SnapshotReader, SnapshotRepository};
use crate::scoring::{aggregate, top_n, PlayerTotalScore, SNAPSHOT_TOP_N};
use crate::snapshot::{Checked, LeaderboardSnapshot};
use crate::time_filter::{is_within, resolve_cutoff, TimeFilter};
use crate::types::{EventId, Timestamp};

#[derive(Debug, Clone, Copy)]
pub struct SnapshotStoreConfig {
    /// Entries kept per snapshot.
    pub top_n: usize,
    /// Offset whose calendar defines "start of day/month".
    pub utc_offset: FixedOffset,
    /// Only aggregate rows flagged as published.
    pub published_only: bool,
}

impl Default for SnapshotStoreConfig {
    fn default() -> Self {
        Self {
            top_n: SNAPSHOT_TOP_N,
            utc_offset: Utc.fix(),
            published_only: true,
        }
    }
}

#[derive(Clone)]
pub struct SnapshotStore {
    scores: Arc<dyn ScoreSource>,
    snapshots: Arc<dyn SnapshotRepository>,
    events: Arc<dyn EventCatalog>,
    config: SnapshotStoreConfig,
}

impl SnapshotStore {
    pub fn new(
        scores: Arc<dyn ScoreSource>,
        snapshots: Arc<dyn SnapshotRepository>,
        events: Arc<dyn EventCatalog>,
        config: SnapshotStoreConfig,
    ) -> Self {
        Self {
            scores,
            snapshots,
            events,
            config,
        }
    }

    pub fn config(&self) -> &SnapshotStoreConfig {
        &self.config
    }

    /// Stored scores for the key, or `None` when there is no row or the
    /// payload fails validation.
    pub async fn fetch(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<Option<Vec<PlayerTotalScore>>, CoreError> {
        let Some(stored) = self.snapshots.get_snapshot(event_id, time_filter).await? else {
            return Ok(None);
        };

        match stored.check() {
            Checked::Valid(snapshot) => Ok(Some(snapshot.scores)),
            Checked::Invalid(reason) => {
                tracing::warn!(
                    event_id = %event_id,
                    time_filter = %time_filter,
                    reason = %reason,
                    "Rejected malformed snapshot payload",
                );
                Ok(None)
            }
        }
    }

    /// Ranked top-N for the key as of `now`, without persisting anything.
    pub async fn compute_at(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
        now: Timestamp,
    ) -> Result<Vec<PlayerTotalScore>, CoreError> {
        let event = self
            .events
            .find_event(event_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: event_id.to_string(),
            })?;

        let cutoff = resolve_cutoff(time_filter, &now.with_timezone(&self.config.utc_offset));
        let mut rows = self
            .scores
            .list_scores(&ScoreQuery {
                event_id,
                since: cutoff,
                published_only: self.config.published_only,
            })
            .await?;
        rows.retain(|row| is_within(cutoff, row.created_at));

        Ok(top_n(aggregate(&rows, event.hole_count), self.config.top_n))
    }

    pub async fn compute(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<Vec<PlayerTotalScore>, CoreError> {
        self.compute_at(event_id, time_filter, Utc::now()).await
    }

    /// Recompute the key as of `now` and overwrite the stored snapshot.
    pub async fn refresh_at(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
        now: Timestamp,
    ) -> Result<LeaderboardSnapshot, CoreError> {
        let scores = self.compute_at(event_id, time_filter, now).await?;
        self.snapshots
            .upsert_snapshot(event_id, time_filter, &scores, now)
            .await?;

        tracing::debug!(
            event_id = %event_id,
            time_filter = %time_filter,
            entries = scores.len(),
            "Snapshot refreshed",
        );

        Ok(LeaderboardSnapshot {
            event_id,
            time_filter,
            scores,
            updated_at: now,
        })
    }

    pub async fn refresh(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<LeaderboardSnapshot, CoreError> {
        self.refresh_at(event_id, time_filter, Utc::now()).await
    }

    /// Events shown on the main leaderboard.
    pub async fn list_events(&self) -> Result<Vec<EventMeta>, CoreError> {
        self.events.list_events().await
    }

    /// Every filter configured for the event, default first.
    pub async fn event_filters(&self, event_id: EventId) -> Result<Vec<TimeFilter>, CoreError> {
        self.events
            .find_event(event_id)
            .await?
            .map(|e| e.time_filters())
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: event_id.to_string(),
            })
    }
}

#[async_trait]
impl SnapshotReader for SnapshotStore {
    async fn fetch(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<Option<Vec<PlayerTotalScore>>, CoreError> {
        SnapshotStore::fetch(self, event_id, time_filter).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! In-process implementation of every storage port.
//!
//! Used by tests and by anything that needs the engine without a database.
//! `set_offline(true)` makes every port call fail with a source error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::board::EventMeta;
use crate::error::CoreError;
use crate::pending_writes::PendingScoreWrite;
use crate::ports::{EventCatalog, ScoreQuery, ScoreSource, ScoreWriter, SnapshotRepository};
use crate::scoring::{PlayerHoleScore, PlayerTotalScore};
use crate::snapshot::StoredSnapshot;
use crate::time_filter::{is_within, TimeFilter};
use crate::types::{EventId, Timestamp};

struct StoredRow {
    event_id: EventId,
    client_id: Option<Uuid>,
    is_published: bool,
    row: PlayerHoleScore,
}

#[derive(Default)]
pub struct InMemoryLeaderboardStore {
    rows: RwLock<Vec<StoredRow>>,
    snapshots: RwLock<HashMap<(EventId, TimeFilter), StoredSnapshot>>,
    events: RwLock<IndexMap<EventId, EventMeta>>,
    offline: AtomicBool,
    snapshot_writes: AtomicUsize,
}

impl InMemoryLeaderboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful snapshot upserts so far.
    pub fn snapshot_writes(&self) -> usize {
        self.snapshot_writes.load(Ordering::SeqCst)
    }

    pub async fn insert_event(&self, event: EventMeta) {
        self.events.write().await.insert(event.id, event);
    }

    pub async fn insert_row(&self, event_id: EventId, row: PlayerHoleScore, is_published: bool) {
        self.rows.write().await.push(StoredRow {
            event_id,
            client_id: None,
            is_published,
            row,
        });
    }

    /// Store a snapshot payload as-is, bypassing validation.
    pub async fn put_raw_snapshot(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
        payload: Value,
        updated_at: Timestamp,
    ) {
        self.snapshots.write().await.insert(
            (event_id, time_filter),
            StoredSnapshot {
                event_id,
                time_filter,
                payload,
                updated_at,
            },
        );
    }

    pub async fn row_count(&self, event_id: EventId) -> usize {
        self.rows
            .read()
            .await
            .iter()
            .filter(|r| r.event_id == event_id)
            .count()
    }

    fn check_online(&self, what: &str) -> Result<(), CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Source(format!("{what} offline")));
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreSource for InMemoryLeaderboardStore {
    async fn list_scores(&self, query: &ScoreQuery) -> Result<Vec<PlayerHoleScore>, CoreError> {
        self.check_online("Score store")?;

        let mut rows: Vec<PlayerHoleScore> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.event_id == query.event_id)
            .filter(|r| r.is_published || !query.published_only)
            .filter(|r| is_within(query.since, r.row.created_at))
            .map(|r| r.row.clone())
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryLeaderboardStore {
    async fn get_snapshot(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<Option<StoredSnapshot>, CoreError> {
        self.check_online("Snapshot store")?;
        Ok(self.snapshots.read().await.get(&(event_id, time_filter)).cloned())
    }

    async fn upsert_snapshot(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
        scores: &[PlayerTotalScore],
        updated_at: Timestamp,
    ) -> Result<(), CoreError> {
        self.check_online("Snapshot store")?;
        let payload =
            serde_json::to_value(scores).map_err(|e| CoreError::Internal(e.to_string()))?;
        self.put_raw_snapshot(event_id, time_filter, payload, updated_at)
            .await;
        self.snapshot_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl EventCatalog for InMemoryLeaderboardStore {
    async fn find_event(&self, event_id: EventId) -> Result<Option<EventMeta>, CoreError> {
        self.check_online("Event catalog")?;
        Ok(self.events.read().await.get(&event_id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<EventMeta>, CoreError> {
        self.check_online("Event catalog")?;
        Ok(self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.is_published && e.show_on_main_leaderboard)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ScoreWriter for InMemoryLeaderboardStore {
    async fn write_score(&self, write: &PendingScoreWrite) -> Result<(), CoreError> {
        self.check_online("Score store")?;

        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| r.client_id == Some(write.client_id)) {
            return Ok(());
        }
        rows.push(StoredRow {
            event_id: write.event_id,
            client_id: Some(write.client_id),
            is_published: true,
            row: write.to_row(),
        });
        Ok(())
    }
}

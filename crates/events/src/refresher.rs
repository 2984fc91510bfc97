//! Snapshot refresher service.
//!
//! [`SnapshotRefresher`] listens for raw score row changes on the
//! [`ChangeBus`], recomputes every configured snapshot of each touched
//! event, and publishes the fresh snapshots back onto the bus.

use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexSet;
use leaderboard_core::changes::{score_row_event, SCORES_TOPIC};
use leaderboard_core::error::CoreError;
use leaderboard_core::snapshot::LeaderboardSnapshot;
use leaderboard_core::snapshot_store::SnapshotStore;
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::EventId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::{ChangeBus, ChangeNotification};

#[derive(Clone)]
pub struct SnapshotRefresher {
    store: SnapshotStore,
    bus: Arc<ChangeBus>,
}

impl SnapshotRefresher {
    pub fn new(store: SnapshotStore, bus: Arc<ChangeBus>) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Recompute, persist and publish one snapshot.
    pub async fn refresh(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
    ) -> Result<LeaderboardSnapshot, CoreError> {
        let snapshot = self.store.refresh(event_id, time_filter).await?;
        self.bus.publish_snapshot(&snapshot);
        Ok(snapshot)
    }

    /// Refresh every filter configured for the event concurrently.
    ///
    /// Per-filter failures are logged and left out of the result; only a
    /// failure to load the event itself is returned.
    pub async fn refresh_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<LeaderboardSnapshot>, CoreError> {
        let filters = self.store.event_filters(event_id).await?;
        let results = join_all(filters.iter().map(|&f| self.refresh(event_id, f))).await;

        let mut refreshed = Vec::with_capacity(results.len());
        for (filter, result) in filters.iter().zip(results) {
            match result {
                Ok(snapshot) => refreshed.push(snapshot),
                Err(e) => tracing::error!(
                    event_id = %event_id,
                    time_filter = %filter,
                    error = %e,
                    "Failed to refresh snapshot",
                ),
            }
        }
        Ok(refreshed)
    }

    /// Run until cancelled or the bus closes.
    ///
    /// Changes that are already queued when a batch starts are coalesced,
    /// so a burst of rows for one event triggers one refresh.
    pub async fn run(
        &self,
        mut receiver: broadcast::Receiver<ChangeNotification>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Snapshot refresher started");

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Snapshot refresher cancelled");
                    break;
                }
                received = receiver.recv() => received,
            };

            let mut pending = IndexSet::new();
            match received {
                Ok(notification) => collect(&notification, &mut pending),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Snapshot refresher lagged, refreshing all events");
                    self.collect_all(&mut pending).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Change bus closed, snapshot refresher shutting down");
                    break;
                }
            }

            loop {
                match receiver.try_recv() {
                    Ok(notification) => collect(&notification, &mut pending),
                    Err(broadcast::error::TryRecvError::Lagged(_)) => {
                        self.collect_all(&mut pending).await;
                    }
                    Err(_) => break,
                }
            }

            for event_id in pending {
                if let Err(e) = self.refresh_event(event_id).await {
                    tracing::error!(event_id = %event_id, error = %e, "Failed to refresh event snapshots");
                }
            }
        }
    }

    async fn collect_all(&self, pending: &mut IndexSet<EventId>) {
        match self.store.list_events().await {
            Ok(events) => pending.extend(events.into_iter().map(|e| e.id)),
            Err(e) => tracing::error!(error = %e, "Failed to list events after lag"),
        }
    }
}

fn collect(notification: &ChangeNotification, pending: &mut IndexSet<EventId>) {
    if notification.topic != SCORES_TOPIC {
        return;
    }
    match score_row_event(&notification.payload) {
        Some(event_id) => {
            pending.insert(event_id);
        }
        None => tracing::warn!("Score change without an event id, ignored"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::sync::Arc;

use leaderboard_core::snapshot_store::SnapshotStore;
use leaderboard_db::PgLeaderboardStore;
use leaderboard_events::{ChangeBus, SnapshotRefresher};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: leaderboard_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Snapshot reads and in-process computation.
    pub snapshots: SnapshotStore,
    /// Recompute + persist + publish, shared with the background refresher.
    pub refresher: SnapshotRefresher,
    /// Change bus the WebSocket clients are fed from.
    pub bus: Arc<ChangeBus>,
}

impl AppState {
    /// Wire the PostgreSQL store into the snapshot services.
    pub fn new(pool: leaderboard_db::DbPool, config: ServerConfig, bus: Arc<ChangeBus>) -> Self {
        let pg = Arc::new(PgLeaderboardStore::new(pool.clone()));
        let snapshots = SnapshotStore::new(pg.clone(), pg.clone(), pg, config.snapshots);
        let refresher = SnapshotRefresher::new(snapshots.clone(), Arc::clone(&bus));

        Self {
            pool,
            config: Arc::new(config),
            snapshots,
            refresher,
            bus,
        }
    }
}

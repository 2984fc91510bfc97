//! In-process change bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ChangeBus`] fans out every [`ChangeNotification`] to all current
//! subscribers. It is designed to be shared via `Arc<ChangeBus>`.

use chrono::{DateTime, Utc};
use leaderboard_core::changes::{SnapshotChange, SNAPSHOTS_TOPIC};
use leaderboard_core::snapshot::LeaderboardSnapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ChangeNotification
// ---------------------------------------------------------------------------

/// One change as received from a realtime source.
///
/// The payload is untrusted JSON; consumers validate it with the parsers in
/// [`leaderboard_core::changes`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Source table or logical channel, e.g. `"leaderboard_snapshots"`.
    pub topic: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl ChangeNotification {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            received_at: Utc::now(),
        }
    }

    pub fn snapshot(snapshot: &LeaderboardSnapshot) -> Self {
        let change = SnapshotChange {
            event_id: snapshot.event_id,
            time_filter: snapshot.time_filter,
            scores: snapshot.scores.clone(),
        };
        Self::new(SNAPSHOTS_TOPIC, change.to_payload())
    }
}

// ---------------------------------------------------------------------------
// ChangeBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

pub struct ChangeBus {
    sender: broadcast::Sender<ChangeNotification>,
}

impl ChangeBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, notification: ChangeNotification) {
        let _ = self.sender.send(notification);
    }

    pub fn publish_snapshot(&self, snapshot: &LeaderboardSnapshot) {
        self.publish(ChangeNotification::snapshot(snapshot));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Realtime feed: per-(event, filter) subscriptions over the change bus.
//!
//! Each subscription runs its own task. It delivers the current state once
//! on start, then every matching snapshot change in channel order. Every
//! delivery is a whole-state replacement.

use std::sync::{Arc, Mutex};

use leaderboard_core::changes::{snapshot_key, SnapshotChange, SNAPSHOTS_TOPIC};
use leaderboard_core::error::CoreError;
use leaderboard_core::ports::SnapshotReader;
use leaderboard_core::scoring::PlayerTotalScore;
use leaderboard_core::snapshot::Checked;
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::EventId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::{ChangeBus, ChangeNotification};

/// What a subscriber is told.
#[derive(Debug)]
pub enum FeedUpdate {
    /// Full replacement; `None` when no valid snapshot exists.
    Scores(Option<Vec<PlayerTotalScore>>),
    /// A fetch, parse or channel failure. The subscription keeps running
    /// unless the bus itself closed.
    Error(CoreError),
}

pub type FeedHandler = Arc<dyn Fn(FeedUpdate) + Send + Sync>;

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle to a live subscription. Unsubscribes on drop.
pub struct Subscription {
    event_id: EventId,
    time_filter: TimeFilter,
    cancel: CancellationToken,
    /// `true` while deliveries are allowed. Held for the whole duration of
    /// each handler call.
    gate: Arc<Mutex<bool>>,
}

impl Subscription {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn time_filter(&self) -> TimeFilter {
        self.time_filter
    }

    pub fn is_active(&self) -> bool {
        *self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stop deliveries. Idempotent.
    ///
    /// Blocks until an in-flight handler call finishes, so it must not be
    /// called while holding a lock the handler also takes. No handler call
    /// starts after this returns.
    pub fn unsubscribe(&self) {
        let mut open = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if *open {
            *open = false;
            self.cancel.cancel();
            tracing::debug!(
                event_id = %self.event_id,
                time_filter = %self.time_filter,
                "Feed subscription closed",
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ---------------------------------------------------------------------------
// RealtimeFeed
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RealtimeFeed {
    bus: Arc<ChangeBus>,
    reader: Arc<dyn SnapshotReader>,
}

impl RealtimeFeed {
    pub fn new(bus: Arc<ChangeBus>, reader: Arc<dyn SnapshotReader>) -> Self {
        Self { bus, reader }
    }

    /// Start a subscription. Must be called inside a tokio runtime.
    ///
    /// The bus receiver is registered before the initial fetch, so no change
    /// published after this call is missed.
    pub fn subscribe(
        &self,
        event_id: EventId,
        time_filter: TimeFilter,
        handler: FeedHandler,
    ) -> Subscription {
        let cancel = CancellationToken::new();
        let gate = Arc::new(Mutex::new(true));

        let task = FeedTask {
            event_id,
            time_filter,
            reader: Arc::clone(&self.reader),
            rx: self.bus.subscribe(),
            cancel: cancel.clone(),
            gate: Arc::clone(&gate),
            handler,
        };
        tokio::spawn(task.run());

        tracing::debug!(
            event_id = %event_id,
            time_filter = %time_filter,
            "Feed subscription opened",
        );

        Subscription {
            event_id,
            time_filter,
            cancel,
            gate,
        }
    }
}

struct FeedTask {
    event_id: EventId,
    time_filter: TimeFilter,
    reader: Arc<dyn SnapshotReader>,
    rx: broadcast::Receiver<ChangeNotification>,
    cancel: CancellationToken,
    gate: Arc<Mutex<bool>>,
    handler: FeedHandler,
}

impl FeedTask {
    async fn run(mut self) {
        if !self.fetch_and_deliver().await {
            return;
        }

        loop {
            let received = tokio::select! {
                _ = self.cancel.cancelled() => return,
                received = self.rx.recv() => received,
            };

            match received {
                Ok(notification) => self.handle(&notification),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        event_id = %self.event_id,
                        time_filter = %self.time_filter,
                        skipped,
                        "Feed lagged, re-fetching current state",
                    );
                    if !self.fetch_and_deliver().await {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.deliver(FeedUpdate::Error(CoreError::Subscription(
                        "change bus closed".to_string(),
                    )));
                    return;
                }
            }
        }
    }

    /// Returns `false` if the subscription was cancelled meanwhile.
    async fn fetch_and_deliver(&self) -> bool {
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            fetched = self.reader.fetch(self.event_id, self.time_filter) => fetched,
        };

        let update = match fetched {
            Ok(scores) => FeedUpdate::Scores(scores),
            Err(e) => FeedUpdate::Error(e),
        };
        self.deliver(update)
    }

    fn handle(&self, notification: &ChangeNotification) {
        if notification.topic != SNAPSHOTS_TOPIC {
            return;
        }

        match snapshot_key(&notification.payload) {
            Some((event_id, filter))
                if event_id == self.event_id && filter == self.time_filter.as_str() => {}
            Some(_) => return,
            None => {
                self.deliver(FeedUpdate::Error(CoreError::Validation(
                    "snapshot change without event_id/time_filter".to_string(),
                )));
                return;
            }
        }

        let update = match SnapshotChange::parse(&notification.payload) {
            Checked::Valid(change) => FeedUpdate::Scores(Some(change.scores)),
            Checked::Invalid(reason) => FeedUpdate::Error(CoreError::Validation(reason)),
        };
        self.deliver(update);
    }

    /// Invoke the handler unless unsubscribed. Returns whether it is still open.
    fn deliver(&self, update: FeedUpdate) -> bool {
        let open = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if *open {
            (self.handler)(update);
        }
        *open
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

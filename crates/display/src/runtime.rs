//! Board rotation runtime.
//!
//! A [`BoardRuntime`] holds the boards of one display session, keeps a live
//! feed subscription for the active board only, and rotates through boards
//! in insertion order on a [`RotationTimer`].
//!
//! Locking: the session state sits behind a std mutex that is never held
//! across an await, while unsubscribing, or while stopping the timer. Feed
//! handlers take the same mutex, and unsubscribing waits for an in-flight
//! handler, so subscriptions are always dropped after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use leaderboard_core::board::LeaderboardBoard;
use leaderboard_core::rotation::{CountdownState, DEFAULT_ROTATION_INTERVAL};
use leaderboard_core::scoring::PlayerTotalScore;
use leaderboard_core::types::Timestamp;
use leaderboard_events::{FeedHandler, FeedUpdate, RealtimeFeed, Subscription};
use serde::Serialize;
use tokio::sync::watch;

use crate::timer::{RotateCallback, RotationTimer};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub rotation_interval: Duration,
    pub rotation_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            rotation_enabled: true,
        }
    }
}

/// Read-only copy of one board's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub board: LeaderboardBoard,
    /// `None` until the first delivery, or when no snapshot exists.
    pub scores: Option<Vec<PlayerTotalScore>>,
    pub error: Option<String>,
    pub loading: bool,
    pub last_updated: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationStatus {
    pub active_board_id: Option<String>,
    pub time_until_rotation: Duration,
    /// A timer is running and not paused.
    pub is_rotating: bool,
    pub last_updated: Option<Timestamp>,
    pub board_count: usize,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct BoardEntry {
    board: LeaderboardBoard,
    scores: Option<Vec<PlayerTotalScore>>,
    error: Option<String>,
    loading: bool,
    last_updated: Option<Timestamp>,
    subscription: Option<Subscription>,
    /// Identifies the live subscription; updates carrying another token are
    /// stale and dropped.
    subscription_token: Option<u64>,
}

impl BoardEntry {
    fn new(board: LeaderboardBoard) -> Self {
        Self {
            board,
            scores: None,
            error: None,
            loading: false,
            last_updated: None,
            subscription: None,
            subscription_token: None,
        }
    }

    fn view(&self) -> BoardView {
        BoardView {
            board: self.board.clone(),
            scores: self.scores.clone(),
            error: self.error.clone(),
            loading: self.loading,
            last_updated: self.last_updated,
        }
    }

    fn take_subscription(&mut self) -> Option<Subscription> {
        self.subscription_token = None;
        self.subscription.take()
    }
}

#[derive(Default)]
struct RuntimeState {
    boards: IndexMap<String, BoardEntry>,
    active_board_id: Option<String>,
    activated_at: Option<Timestamp>,
    timer: Option<RotationTimer>,
    config: RuntimeConfig,
    initialized: bool,
    next_token: u64,
}

struct RuntimeInner {
    feed: RealtimeFeed,
    state: Mutex<RuntimeState>,
    changes: watch::Sender<u64>,
    countdown: Arc<watch::Sender<CountdownState>>,
}

impl RuntimeInner {
    fn state(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }
}

// ---------------------------------------------------------------------------
// BoardRuntime
// ---------------------------------------------------------------------------

/// One display session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct BoardRuntime {
    inner: Arc<RuntimeInner>,
}

/// Returned by [`BoardRuntime::initialize`]; undoes it.
#[must_use = "dropping the handle leaves the runtime running"]
pub struct RuntimeTeardown {
    inner: Weak<RuntimeInner>,
}

impl RuntimeTeardown {
    /// Stop the timer, drop every subscription and reset all state.
    pub fn teardown(self) {
        if let Some(inner) = self.inner.upgrade() {
            BoardRuntime { inner }.reset();
        }
    }
}

impl BoardRuntime {
    pub fn new(feed: RealtimeFeed) -> Self {
        let config = RuntimeConfig::default();
        let (changes, _) = watch::channel(0);
        let (countdown, _) = watch::channel(CountdownState {
            paused: false,
            time_remaining_seconds: config.rotation_interval.as_secs(),
            interval_ms: config.rotation_interval.as_millis() as u64,
            transitioning: false,
        });
        Self {
            inner: Arc::new(RuntimeInner {
                feed,
                state: Mutex::new(RuntimeState::default()),
                changes,
                countdown: Arc::new(countdown),
            }),
        }
    }

    /// Apply the config and start rotating if enabled. Calling it again
    /// replaces the previous timer and config but keeps the boards.
    pub fn initialize(&self, config: RuntimeConfig) -> RuntimeTeardown {
        let timer = config.rotation_enabled.then(|| {
            RotationTimer::start(
                config.rotation_interval,
                self.rotate_callback(),
                Arc::clone(&self.inner.countdown),
            )
        });

        let old_timer = {
            let mut state = self.inner.state();
            state.config = config;
            state.initialized = true;
            std::mem::replace(&mut state.timer, timer)
        };
        if let Some(old) = old_timer {
            old.stop();
        }

        tracing::info!(
            interval_ms = config.rotation_interval.as_millis() as u64,
            rotation_enabled = config.rotation_enabled,
            "Board runtime initialized",
        );
        self.inner.notify();

        RuntimeTeardown {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state().initialized
    }

    pub fn config(&self) -> RuntimeConfig {
        self.inner.state().config
    }

    /// Add new boards and update existing ones by id. Never removes.
    ///
    /// With no active board, the first input board becomes active.
    pub fn set_boards(&self, boards: Vec<LeaderboardBoard>) {
        let Some(first_id) = boards.first().map(|b| b.id.clone()) else {
            return;
        };

        let resubscribe = {
            let mut guard = self.inner.state();
            let state = &mut *guard;
            let mut active_changed = false;

            for board in boards {
                match state.boards.get_mut(&board.id) {
                    Some(entry) => {
                        let same_source = entry.board.event_id == board.event_id
                            && entry.board.time_filter == board.time_filter;
                        if !same_source && state.active_board_id.as_deref() == Some(board.id.as_str()) {
                            active_changed = true;
                        }
                        entry.board = board;
                    }
                    None => {
                        state.boards.insert(board.id.clone(), BoardEntry::new(board));
                    }
                }
            }

            match state.active_board_id.clone() {
                None => Some(first_id),
                Some(active) if active_changed => Some(active),
                Some(active) => state
                    .boards
                    .get(&active)
                    .is_some_and(|e| e.subscription.is_none())
                    .then_some(active),
            }
        };

        match resubscribe {
            Some(board_id) => self.activate(&board_id, true),
            None => self.inner.notify(),
        }
    }

    /// Show `board_id` now and start a fresh interval. Unknown ids are
    /// ignored and return `false`.
    pub fn set_active_board(&self, board_id: &str) -> bool {
        if !self.inner.state().boards.contains_key(board_id) {
            tracing::warn!(board_id, "Ignoring unknown board");
            return false;
        }
        self.activate(board_id, true);
        true
    }

    /// Advance to the next board in insertion order, wrapping around.
    /// Returns the newly active board id.
    pub fn rotate_to_next(&self) -> Option<String> {
        let (next, same) = {
            let state = self.inner.state();
            if state.boards.is_empty() {
                return None;
            }
            let current = state
                .active_board_id
                .as_ref()
                .and_then(|id| state.boards.get_index_of(id));
            let next_index = current.map_or(0, |i| (i + 1) % state.boards.len());
            let (next_id, _) = state.boards.get_index(next_index)?;
            (next_id.clone(), current == Some(next_index))
        };

        self.activate(&next, !same);
        tracing::debug!(board_id = %next, "Rotated board");
        Some(next)
    }

    pub fn pause_rotation(&self) {
        if let Some(timer) = &self.inner.state().timer {
            timer.pause();
        }
        self.inner.notify();
    }

    pub fn resume_rotation(&self) {
        if let Some(timer) = &self.inner.state().timer {
            timer.resume();
        }
        self.inner.notify();
    }

    pub fn status(&self) -> RotationStatus {
        let state = self.inner.state();
        let active = state
            .active_board_id
            .as_ref()
            .and_then(|id| state.boards.get(id));

        RotationStatus {
            active_board_id: state.active_board_id.clone(),
            time_until_rotation: state
                .timer
                .as_ref()
                .map_or(Duration::ZERO, RotationTimer::time_remaining),
            is_rotating: state.timer.as_ref().is_some_and(|t| !t.is_paused()),
            last_updated: active.and_then(|e| e.last_updated),
            board_count: state.boards.len(),
        }
    }

    pub fn board(&self, board_id: &str) -> Option<BoardView> {
        self.inner.state().boards.get(board_id).map(BoardEntry::view)
    }

    pub fn active_board(&self) -> Option<BoardView> {
        let state = self.inner.state();
        state
            .active_board_id
            .as_ref()
            .and_then(|id| state.boards.get(id))
            .map(BoardEntry::view)
    }

    pub fn boards(&self) -> Vec<BoardView> {
        self.inner.state().boards.values().map(BoardEntry::view).collect()
    }

    /// When the active board was last switched to (or re-shown).
    pub fn activated_at(&self) -> Option<Timestamp> {
        self.inner.state().activated_at
    }

    /// Version counter bumped on every state change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    pub fn countdown(&self) -> watch::Receiver<CountdownState> {
        self.inner.countdown.subscribe()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Make `board_id` active, optionally replacing its subscription.
    ///
    /// Previous subscriptions are released before the new one is opened.
    fn activate(&self, board_id: &str, resubscribe: bool) {
        let released: Vec<Subscription> = {
            let mut state = self.inner.state();
            state.active_board_id = Some(board_id.to_string());
            state.activated_at = Some(Utc::now());
            state
                .boards
                .iter_mut()
                .filter(|(id, _)| resubscribe || id.as_str() != board_id)
                .filter_map(|(_, entry)| entry.take_subscription())
                .collect()
        };
        drop(released);

        {
            let mut state = self.inner.state();
            if state.active_board_id.as_deref() == Some(board_id) {
                self.subscribe_locked(&mut state, board_id);
            }
            if let Some(timer) = &state.timer {
                timer.restart();
            }
        }

        self.inner.notify();
    }

    fn subscribe_locked(&self, state: &mut RuntimeState, board_id: &str) {
        let token = state.next_token;
        let Some(entry) = state.boards.get_mut(board_id) else {
            return;
        };
        if entry.subscription.is_some() {
            return;
        }

        entry.loading = true;
        entry.subscription_token = Some(token);
        entry.subscription = Some(self.inner.feed.subscribe(
            entry.board.event_id,
            entry.board.time_filter,
            self.feed_handler(board_id.to_string(), token),
        ));
        state.next_token += 1;
    }

    fn feed_handler(&self, board_id: String, token: u64) -> FeedHandler {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |update| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut state = inner.state();
                let Some(entry) = state.boards.get_mut(&board_id) else {
                    return;
                };
                if entry.subscription_token != Some(token) {
                    return;
                }

                entry.loading = false;
                match update {
                    FeedUpdate::Scores(scores) => {
                        entry.scores = scores;
                        entry.error = None;
                        entry.last_updated = Some(Utc::now());
                    }
                    FeedUpdate::Error(e) => {
                        tracing::warn!(board_id = %board_id, error = %e, "Board update failed");
                        entry.error = Some(e.to_string());
                    }
                }
            }
            inner.notify();
        })
    }

    fn rotate_callback(&self) -> RotateCallback {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    BoardRuntime { inner }.rotate_to_next();
                }
            })
        })
    }

    fn reset(&self) {
        let (timer, released) = {
            let mut state = self.inner.state();
            let released: Vec<Subscription> = state
                .boards
                .values_mut()
                .filter_map(BoardEntry::take_subscription)
                .collect();
            let timer = state.timer.take();
            let next_token = state.next_token;
            *state = RuntimeState {
                next_token,
                ..RuntimeState::default()
            };
            (timer, released)
        };

        if let Some(timer) = timer {
            timer.stop();
        }
        drop(released);

        tracing::info!("Board runtime torn down");
        self.inner.notify();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_core::memory::InMemoryLeaderboardStore;
    use leaderboard_core::time_filter::TimeFilter;
    use leaderboard_events::ChangeBus;
    use uuid::Uuid;

    fn runtime() -> BoardRuntime {
        let store = Arc::new(InMemoryLeaderboardStore::new());
        let reader = Arc::new(leaderboard_core::snapshot_store::SnapshotStore::new(
            store.clone(),
            store.clone(),
            store,
            Default::default(),
        ));
        BoardRuntime::new(RealtimeFeed::new(Arc::new(ChangeBus::default()), reader))
    }

    fn board(id: &str) -> LeaderboardBoard {
        LeaderboardBoard {
            id: id.to_string(),
            ..LeaderboardBoard::new(Uuid::new_v4(), TimeFilter::AllTime)
        }
    }

    #[tokio::test]
    async fn first_board_becomes_active() {
        let rt = runtime();
        rt.set_boards(vec![board("A"), board("B"), board("C")]);

        let status = rt.status();
        assert_eq!(status.active_board_id.as_deref(), Some("A"));
        assert_eq!(status.board_count, 3);
    }

    #[tokio::test]
    async fn rotation_cycles_in_insertion_order() {
        let rt = runtime();
        rt.set_boards(vec![board("A"), board("B"), board("C")]);

        let seen: Vec<_> = (0..3).filter_map(|_| rt.rotate_to_next()).collect();
        assert_eq!(seen, ["B", "C", "A"]);
    }

    #[tokio::test]
    async fn set_boards_is_additive() {
        let rt = runtime();
        rt.set_boards(vec![board("A"), board("B")]);
        rt.set_boards(vec![board("C")]);

        let ids: Vec<_> = rt.boards().into_iter().map(|b| b.board.id).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(rt.status().active_board_id.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn only_the_active_board_is_subscribed() {
        let rt = runtime();
        rt.set_boards(vec![board("A"), board("B")]);
        rt.rotate_to_next();

        let state = rt.inner.state();
        let live: Vec<_> = state
            .boards
            .iter()
            .filter(|(_, e)| e.subscription.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        assert_eq!(live, ["B"]);
    }

    #[tokio::test]
    async fn unknown_board_is_ignored() {
        let rt = runtime();
        rt.set_boards(vec![board("A")]);
        assert!(!rt.set_active_board("Z"));
        assert_eq!(rt.status().active_board_id.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn status_without_timer_reports_zero() {
        let rt = runtime();
        let status = rt.status();
        assert_eq!(status.active_board_id, None);
        assert_eq!(status.time_until_rotation, Duration::ZERO);
        assert!(!status.is_rotating);
        assert_eq!(rt.rotate_to_next(), None);
    }
}

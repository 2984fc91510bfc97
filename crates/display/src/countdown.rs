//! Rotation countdown store for a display.
//!
//! Owns a [`RotationTimer`] plus the settings needed to recreate it, and
//! exposes the countdown as a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use leaderboard_core::rotation::{ceil_secs, CountdownState, DEFAULT_ROTATION_INTERVAL};
use tokio::sync::watch;

use crate::timer::{RotateCallback, RotationTimer};

struct CountdownInner {
    timer: Option<RotationTimer>,
    on_rotate: Option<RotateCallback>,
    interval: Duration,
    paused: bool,
}

pub struct RotationCountdown {
    inner: Mutex<CountdownInner>,
    state: Arc<watch::Sender<CountdownState>>,
}

impl Default for RotationCountdown {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationCountdown {
    pub fn new() -> Self {
        let (state, _) = watch::channel(idle_state(DEFAULT_ROTATION_INTERVAL, false));
        Self {
            inner: Mutex::new(CountdownInner {
                timer: None,
                on_rotate: None,
                interval: DEFAULT_ROTATION_INTERVAL,
                paused: false,
            }),
            state: Arc::new(state),
        }
    }

    fn inner(&self) -> MutexGuard<'_, CountdownInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store the callback and start counting down a full interval.
    /// Replaces any timer already running.
    pub fn initialize(&self, interval: Duration, on_rotate: RotateCallback) {
        let mut inner = self.inner();
        if let Some(old) = inner.timer.take() {
            old.stop();
        }
        inner.interval = interval;
        inner.paused = false;
        inner.on_rotate = Some(Arc::clone(&on_rotate));
        inner.timer = Some(RotationTimer::start(interval, on_rotate, Arc::clone(&self.state)));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Countdown initialized");
    }

    pub fn pause(&self) {
        let mut inner = self.inner();
        inner.paused = true;
        match &inner.timer {
            Some(timer) => timer.pause(),
            None => {
                let current = *self.state.borrow();
                self.state.send_replace(CountdownState {
                    paused: true,
                    ..current
                });
            }
        }
    }

    /// Resume with a full interval ahead, restarting a stopped timer.
    pub fn resume(&self) {
        let mut inner = self.inner();
        inner.paused = false;
        match &inner.timer {
            Some(timer) => timer.resume(),
            None => self.start_locked(&mut inner),
        }
    }

    /// Rotate now. Returns `false` if not running or already rotating.
    pub fn rotate_now(&self) -> bool {
        self.inner().timer.as_ref().is_some_and(|t| t.rotate_now())
    }

    /// Change the interval and show the new full interval. A stopped,
    /// unpaused countdown is restarted.
    pub fn set_interval(&self, interval: Duration) {
        let mut inner = self.inner();
        inner.interval = interval;
        match &inner.timer {
            Some(timer) => timer.set_interval(interval),
            None if !inner.paused => self.start_locked(&mut inner),
            None => {
                self.state.send_replace(idle_state(interval, true));
            }
        }
    }

    /// Stop ticking. Settings and callback are kept for a later restart.
    pub fn stop(&self) {
        if let Some(timer) = self.inner().timer.take() {
            timer.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner().timer.is_some()
    }

    pub fn current(&self) -> CountdownState {
        *self.state.borrow()
    }

    pub fn state(&self) -> watch::Receiver<CountdownState> {
        self.state.subscribe()
    }

    fn start_locked(&self, inner: &mut CountdownInner) {
        match inner.on_rotate.clone() {
            Some(on_rotate) => {
                inner.timer = Some(RotationTimer::start(
                    inner.interval,
                    on_rotate,
                    Arc::clone(&self.state),
                ));
            }
            None => {
                self.state.send_replace(idle_state(inner.interval, inner.paused));
            }
        }
    }
}

fn idle_state(interval: Duration, paused: bool) -> CountdownState {
    CountdownState {
        paused,
        time_remaining_seconds: ceil_secs(interval),
        interval_ms: interval.as_millis() as u64,
        transitioning: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Tick task driving an [`IntervalClock`].
//!
//! Every 200 ms the task recomputes the remaining time from the clock and
//! publishes it. When the interval has elapsed it runs the rotation
//! callback on its own task; ticks keep going while the callback is in
//! flight and the clock refuses to start a second rotation until it ends.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use leaderboard_core::rotation::{CountdownState, IntervalClock};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// How often the countdown is recomputed.
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

pub type RotateCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct TimerShared {
    clock: Mutex<IntervalClock>,
    state: Arc<watch::Sender<CountdownState>>,
    on_rotate: RotateCallback,
    cancel: CancellationToken,
}

impl TimerShared {
    fn clock(&self) -> MutexGuard<'_, IntervalClock> {
        self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, clock: &IntervalClock) {
        self.state.send_replace(clock.state(Instant::now()));
    }

    fn tick(self: &Arc<Self>) {
        let mut clock = self.clock();
        if clock.try_begin_rotation(Instant::now()) {
            self.spawn_rotation();
        }
        self.publish(&clock);
    }

    /// Run the callback, then leave the transitioning state even if the
    /// callback panicked. A timer stopped meanwhile no longer publishes:
    /// the channel may already belong to its replacement.
    fn spawn_rotation(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        let rotation = (self.on_rotate)();
        tokio::spawn(async move {
            if let Err(e) = tokio::spawn(rotation).await {
                tracing::error!(error = %e, "Rotation callback failed");
            }
            let mut clock = shared.clock();
            clock.finish_rotation(Instant::now());
            if !shared.cancel.is_cancelled() {
                shared.publish(&clock);
            }
        });
    }
}

/// Handle to a running tick task. Stops on drop.
pub struct RotationTimer {
    shared: Arc<TimerShared>,
    cancel: CancellationToken,
}

impl RotationTimer {
    /// Spawn the tick task. Must be called inside a tokio runtime.
    pub fn start(
        interval: Duration,
        on_rotate: RotateCallback,
        state: Arc<watch::Sender<CountdownState>>,
    ) -> Self {
        let clock = IntervalClock::new(interval, Instant::now());
        state.send_replace(clock.state(Instant::now()));

        let cancel = CancellationToken::new();
        let shared = Arc::new(TimerShared {
            clock: Mutex::new(clock),
            state,
            on_rotate,
            cancel: cancel.clone(),
        });

        tokio::spawn(tick_loop(Arc::clone(&shared), cancel.clone()));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Rotation timer started");

        Self { shared, cancel }
    }

    pub fn pause(&self) {
        let mut clock = self.shared.clock();
        clock.pause(Instant::now());
        self.shared.publish(&clock);
    }

    /// Resume with a full interval ahead.
    pub fn resume(&self) {
        let mut clock = self.shared.clock();
        clock.resume(Instant::now());
        self.shared.publish(&clock);
    }

    /// Start a fresh interval without rotating.
    pub fn restart(&self) {
        let mut clock = self.shared.clock();
        clock.restart(Instant::now());
        self.shared.publish(&clock);
    }

    pub fn set_interval(&self, interval: Duration) {
        let mut clock = self.shared.clock();
        clock.set_interval(interval, Instant::now());
        self.shared.publish(&clock);
    }

    /// Rotate immediately. Returns `false` if a rotation is already in flight.
    pub fn rotate_now(&self) -> bool {
        let mut clock = self.shared.clock();
        if !clock.force_begin_rotation() {
            return false;
        }
        self.shared.spawn_rotation();
        self.shared.publish(&clock);
        true
    }

    pub fn time_remaining(&self) -> Duration {
        self.shared.clock().time_remaining(Instant::now())
    }

    pub fn is_paused(&self) -> bool {
        self.shared.clock().is_paused()
    }

    pub fn state(&self) -> CountdownState {
        self.shared.clock().state(Instant::now())
    }

    /// Stop ticking. Idempotent. An in-flight callback still completes.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RotationTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(shared: Arc<TimerShared>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Rotation timer stopped");
                break;
            }
            _ = ticker.tick() => shared.tick(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

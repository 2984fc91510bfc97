//! Elapsed-time rotation clock shared by the board runtime and the
//! countdown.
//!
//! The clock never sleeps and never reads the time itself: every method
//! takes `now`, and remaining time is always derived from the instant the
//! current interval started rather than from counting ticks, so slow or
//! skipped ticks do not accumulate drift.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Default time each board stays on screen.
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest interval accepted; shorter values are raised to this.
pub const MIN_ROTATION_INTERVAL: Duration = Duration::from_millis(1000);

/// Observable countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub paused: bool,
    pub time_remaining_seconds: u64,
    pub interval_ms: u64,
    pub transitioning: bool,
}

#[derive(Debug, Clone)]
pub struct IntervalClock {
    interval: Duration,
    origin: Instant,
    /// Remaining time frozen at the moment of pausing.
    paused_remaining: Option<Duration>,
    transitioning: bool,
}

impl IntervalClock {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval: interval.max(MIN_ROTATION_INTERVAL),
            origin: now,
            paused_remaining: None,
            transitioning: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_paused(&self) -> bool {
        self.paused_remaining.is_some()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn time_remaining(&self, now: Instant) -> Duration {
        match self.paused_remaining {
            Some(frozen) => frozen,
            None => self
                .interval
                .saturating_sub(now.saturating_duration_since(self.origin)),
        }
    }

    /// Remaining time rounded up to whole seconds.
    pub fn time_remaining_secs(&self, now: Instant) -> u64 {
        ceil_secs(self.time_remaining(now))
    }

    /// A full interval has elapsed and nothing blocks a rotation.
    pub fn is_due(&self, now: Instant) -> bool {
        !self.transitioning
            && !self.is_paused()
            && now.saturating_duration_since(self.origin) >= self.interval
    }

    /// Enter the transitioning state if a rotation is due.
    pub fn try_begin_rotation(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.transitioning = true;
            true
        } else {
            false
        }
    }

    /// Enter the transitioning state regardless of elapsed time, unless a
    /// rotation is already in flight. Works while paused.
    pub fn force_begin_rotation(&mut self) -> bool {
        if self.transitioning {
            return false;
        }
        self.transitioning = true;
        true
    }

    /// Leave the transitioning state and start a fresh interval.
    pub fn finish_rotation(&mut self, now: Instant) {
        self.transitioning = false;
        self.restart(now);
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused_remaining.is_none() {
            self.paused_remaining = Some(self.time_remaining(now));
        }
    }

    /// Resume with a full interval ahead.
    pub fn resume(&mut self, now: Instant) {
        self.paused_remaining = None;
        self.origin = now;
    }

    /// Start a fresh interval from `now`. A paused clock stays paused with
    /// the full interval showing.
    pub fn restart(&mut self, now: Instant) {
        self.origin = now;
        if self.paused_remaining.is_some() {
            self.paused_remaining = Some(self.interval);
        }
    }

    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval.max(MIN_ROTATION_INTERVAL);
        self.restart(now);
    }

    pub fn state(&self, now: Instant) -> CountdownState {
        CountdownState {
            paused: self.is_paused(),
            time_remaining_seconds: self.time_remaining_secs(now),
            interval_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            transitioning: self.transitioning,
        }
    }
}

pub fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn clock() -> (IntervalClock, Instant) {
        let now = Instant::now();
        (IntervalClock::new(INTERVAL, now), now)
    }

    #[test]
    fn remaining_counts_down_from_origin() {
        let (clock, t0) = clock();
        assert_eq!(clock.time_remaining_secs(t0), 10);
        assert_eq!(clock.time_remaining_secs(t0 + Duration::from_millis(2_500)), 8);
        assert_eq!(clock.time_remaining(t0 + Duration::from_secs(60)), Duration::ZERO);
    }

    #[test]
    fn due_only_after_full_interval() {
        let (clock, t0) = clock();
        assert!(!clock.is_due(t0 + Duration::from_millis(9_999)));
        assert!(clock.is_due(t0 + INTERVAL));
    }

    #[test]
    fn transitioning_blocks_a_second_rotation() {
        let (mut clock, t0) = clock();
        let due = t0 + INTERVAL;
        assert!(clock.try_begin_rotation(due));
        assert!(clock.is_transitioning());
        assert!(!clock.try_begin_rotation(due));
        assert!(!clock.force_begin_rotation());

        clock.finish_rotation(due);
        assert!(!clock.is_transitioning());
        assert_eq!(clock.time_remaining(due), INTERVAL);
    }

    #[test]
    fn pause_freezes_remaining_and_blocks_rotation() {
        let (mut clock, t0) = clock();
        clock.pause(t0 + Duration::from_secs(4));

        let later = t0 + Duration::from_secs(30);
        assert_eq!(clock.time_remaining_secs(later), 6);
        assert!(!clock.is_due(later));
    }

    #[test]
    fn resume_resets_to_full_interval() {
        let (mut clock, t0) = clock();
        clock.pause(t0 + Duration::from_secs(4));
        let resumed_at = t0 + Duration::from_secs(20);
        clock.resume(resumed_at);

        assert!(!clock.is_paused());
        assert_eq!(clock.time_remaining(resumed_at), INTERVAL);
    }

    #[test]
    fn manual_rotation_allowed_while_paused() {
        let (mut clock, t0) = clock();
        clock.pause(t0 + Duration::from_secs(3));
        assert!(clock.force_begin_rotation());

        clock.finish_rotation(t0 + Duration::from_secs(5));
        assert!(clock.is_paused());
        assert_eq!(clock.time_remaining(t0 + Duration::from_secs(50)), INTERVAL);
    }

    #[test]
    fn set_interval_restarts_and_clamps() {
        let (mut clock, t0) = clock();
        let now = t0 + Duration::from_secs(7);
        clock.set_interval(Duration::from_secs(20), now);
        assert_eq!(clock.time_remaining_secs(now), 20);

        clock.set_interval(Duration::ZERO, now);
        assert_eq!(clock.interval(), MIN_ROTATION_INTERVAL);
    }

    #[test]
    fn state_reports_interval_in_millis() {
        let (clock, t0) = clock();
        let state = clock.state(t0 + Duration::from_millis(200));
        assert_eq!(
            state,
            CountdownState {
                paused: false,
                time_remaining_seconds: 10,
                interval_ms: 10_000,
                transitioning: false,
            }
        );
    }

    #[test]
    fn ceil_rounds_partial_seconds_up() {
        assert_eq!(ceil_secs(Duration::ZERO), 0);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::from_millis(2_000)), 2);
    }
}

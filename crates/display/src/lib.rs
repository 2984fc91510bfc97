//! Display-side leaderboard state: which board is showing, for how long,
//! and what it currently shows.
//!
//! - [`RotationTimer`]: the tick task behind every rotation countdown.
//! - [`RotationCountdown`]: pause/resume/skip countdown store for a display.
//! - [`BoardRuntime`]: per-session board set with live scores and rotation.
//!
//! Every type here is an owned instance; create one per display session.

pub mod countdown;
pub mod runtime;
pub mod timer;

pub use countdown::RotationCountdown;
pub use runtime::{BoardRuntime, BoardView, RotationStatus, RuntimeConfig, RuntimeTeardown};
pub use timer::{RotateCallback, RotationTimer};

//! Realtime leaderboard change plumbing.
//!
//! - [`ChangeBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying untyped [`ChangeNotification`]s.
//! - [`RealtimeFeed`]: per-(event, filter) subscriptions that deliver whole
//!   score lists to a callback.
//! - [`SnapshotRefresher`]: background service that recomputes snapshots
//!   when raw score rows change.
//! - [`PgChangeListener`]: bridge from PostgreSQL `LISTEN` into the bus.

pub mod backoff;
pub mod bus;
pub mod feed;
pub mod pg_listener;
pub mod refresher;

pub use bus::{ChangeBus, ChangeNotification};
pub use feed::{FeedHandler, FeedUpdate, RealtimeFeed, Subscription};
pub use pg_listener::PgChangeListener;
pub use refresher::SnapshotRefresher;

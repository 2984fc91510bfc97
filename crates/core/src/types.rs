/// Events are keyed by UUID in the backing store.
pub type EventId = uuid::Uuid;

/// Player identity is opaque to the core; only equality matters.
pub type PlayerId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Errors shared by every crate in the workspace.
///
/// Data-shape problems are usually handled locally (rows skipped, snapshots
/// rejected) and only surface as [`CoreError::Validation`] when a caller asks
/// for strict behaviour.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The underlying score or snapshot store failed.
    #[error("Source error: {0}")]
    Source(String),

    /// The realtime channel reported a failure.
    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

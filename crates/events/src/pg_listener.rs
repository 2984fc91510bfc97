//! PostgreSQL `LISTEN` bridge.
//!
//! [`PgChangeListener`] listens on the `leaderboard_changes` channel filled by
//! the table triggers and republishes each notification on the
//! [`ChangeBus`], using the source table name as the topic. Lost
//! connections are re-established with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use leaderboard_db::DbPool;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;

use crate::backoff::{next_delay, wait, BackoffConfig};
use crate::bus::{ChangeBus, ChangeNotification};

/// Channel the migrations' trigger notifies on.
pub const CHANGES_CHANNEL: &str = "leaderboard_changes";

pub struct PgChangeListener {
    pool: DbPool,
    bus: Arc<ChangeBus>,
    backoff: BackoffConfig,
}

impl PgChangeListener {
    pub fn new(pool: DbPool, bus: Arc<ChangeBus>) -> Self {
        Self {
            pool,
            bus,
            backoff: BackoffConfig::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut delay = self.backoff.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.listen(&cancel, &mut delay).await {
                Ok(()) => {
                    tracing::info!("Change listener cancelled");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Change listener disconnected, retrying",
                    );
                }
            }

            if !wait(delay, &cancel).await {
                tracing::info!("Change listener cancelled");
                return;
            }
            delay = next_delay(delay, &self.backoff);
        }
    }

    /// Listen until cancelled (`Ok`) or the connection fails (`Err`).
    ///
    /// Resets `delay` once a connection is established.
    async fn listen(
        &self,
        cancel: &CancellationToken,
        delay: &mut Duration,
    ) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGES_CHANNEL).await?;
        *delay = self.backoff.initial_delay;
        tracing::info!(channel = CHANGES_CHANNEL, "Listening for leaderboard changes");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                notification = listener.recv() => {
                    let notification = notification?;
                    if let Some(change) = to_change(notification.payload()) {
                        self.bus.publish(change);
                    }
                }
            }
        }
    }
}

/// Decode a trigger payload into a bus notification keyed by table name.
fn to_change(raw: &str) -> Option<ChangeNotification> {
    let payload: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding non-JSON change notification");
            return None;
        }
    };

    let Some(table) = payload.get("table").and_then(|t| t.as_str()) else {
        tracing::warn!("Discarding change notification without a table");
        return None;
    };

    Some(ChangeNotification::new(table.to_string(), payload))
}

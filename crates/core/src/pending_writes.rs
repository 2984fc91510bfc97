//! Ordered queue of score writes recorded while the store was unreachable.
//!
//! Entries carry a client-generated id so replaying one that the store
//! already accepted is harmless. A flush writes in recording order, removes
//! each entry once acknowledged and stops at the first failure, leaving the
//! rest for the next attempt.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::CoreError;
use crate::ports::ScoreWriter;
use crate::scoring::PlayerHoleScore;
use crate::types::{EventId, PlayerId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingScoreWrite {
    pub client_id: Uuid,
    pub event_id: EventId,
    pub player_id: PlayerId,
    pub name: String,
    pub hole_number: i32,
    pub score: Option<i32>,
    pub recorded_at: Timestamp,
}

impl PendingScoreWrite {
    pub fn to_row(&self) -> PlayerHoleScore {
        PlayerHoleScore {
            player_id: Some(self.player_id.clone()),
            name: self.name.clone(),
            score: self.score,
            hole_number: Some(self.hole_number),
            created_at: self.recorded_at,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub remaining: usize,
}

#[derive(Default)]
pub struct PendingWriteQueue {
    entries: Mutex<VecDeque<PendingScoreWrite>>,
    /// Serializes flushes so two callers never replay the same entry at once.
    flushing: Mutex<()>,
}

impl PendingWriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from a previously exported list.
    pub fn restore(entries: Vec<PendingScoreWrite>) -> Self {
        Self {
            entries: Mutex::new(entries.into()),
            flushing: Mutex::new(()),
        }
    }

    pub async fn enqueue(&self, write: PendingScoreWrite) {
        self.entries.lock().await.push_back(write);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Current contents in order, for durable storage.
    pub async fn export(&self) -> Vec<PendingScoreWrite> {
        self.entries.lock().await.iter().cloned().collect()
    }

    pub async fn flush(&self, writer: &dyn ScoreWriter) -> Result<FlushReport, CoreError> {
        let _flushing = self.flushing.lock().await;
        let mut written = 0;

        loop {
            let Some(next) = self.entries.lock().await.front().cloned() else {
                break;
            };

            if let Err(e) = writer.write_score(&next).await {
                let remaining = self.len().await;
                tracing::warn!(
                    client_id = %next.client_id,
                    written,
                    remaining,
                    error = %e,
                    "Pending score flush stopped",
                );
                return Err(e);
            }

            let mut entries = self.entries.lock().await;
            if entries.front().map(|w| w.client_id) == Some(next.client_id) {
                entries.pop_front();
            }
            written += 1;
        }

        Ok(FlushReport {
            written,
            remaining: self.len().await,
        })
    }
}

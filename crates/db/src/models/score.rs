//! Per-hole score model.

use leaderboard_core::scoring::PlayerHoleScore;
use leaderboard_core::types::{EventId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `player_hole_scores` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScoreRow {
    pub id: i64,
    pub event_id: EventId,
    pub client_id: Option<Uuid>,
    pub player_id: Option<String>,
    pub name: String,
    pub score: Option<i32>,
    pub hole_number: Option<i32>,
    pub is_published: bool,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl From<ScoreRow> for PlayerHoleScore {
    fn from(row: ScoreRow) -> Self {
        PlayerHoleScore {
            player_id: row.player_id,
            name: row.name,
            score: row.score,
            hole_number: row.hole_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// DTO for inserting a score row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScore {
    /// Client-generated id; replays with the same id are ignored.
    pub client_id: Option<Uuid>,
    pub event_id: EventId,
    pub player_id: String,
    pub name: String,
    pub hole_number: i32,
    pub score: Option<i32>,
    pub is_published: bool,
    /// Defaults to `NOW()` when absent.
    pub created_at: Option<Timestamp>,
}

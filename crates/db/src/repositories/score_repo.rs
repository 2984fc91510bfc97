//! Repository for the `player_hole_scores` table.

use leaderboard_core::types::{EventId, Timestamp};
use sqlx::PgPool;

use crate::models::score::{CreateScore, ScoreRow};

/// Column list for `player_hole_scores` queries.
const COLUMNS: &str = "\
    id, event_id, client_id, player_id, name, score, hole_number, \
    is_published, created_at, updated_at";

pub struct ScoreRepo;

impl ScoreRepo {
    /// Rows for one event in insertion order.
    ///
    /// `since` is an inclusive lower bound on `created_at`.
    pub async fn list_for_event(
        pool: &PgPool,
        event_id: EventId,
        since: Option<Timestamp>,
        published_only: bool,
    ) -> Result<Vec<ScoreRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM player_hole_scores \
             WHERE event_id = $1 \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND (NOT $3 OR is_published) \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ScoreRow>(&query)
            .bind(event_id)
            .bind(since)
            .bind(published_only)
            .fetch_all(pool)
            .await
    }

    /// Insert a row unless one with the same `client_id` already exists.
    ///
    /// Returns `None` when the insert was skipped as a duplicate.
    pub async fn insert_idempotent(
        pool: &PgPool,
        input: &CreateScore,
    ) -> Result<Option<ScoreRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO player_hole_scores \
                (client_id, event_id, player_id, name, hole_number, score, is_published, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW())) \
             ON CONFLICT (client_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScoreRow>(&query)
            .bind(input.client_id)
            .bind(input.event_id)
            .bind(&input.player_id)
            .bind(&input.name)
            .bind(input.hole_number)
            .bind(input.score)
            .bind(input.is_published)
            .bind(input.created_at)
            .fetch_optional(pool)
            .await
    }
}

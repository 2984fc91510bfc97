//! Repository for the `events` table (read-only).

use leaderboard_core::types::EventId;
use sqlx::PgPool;

use crate::models::event::EventRow;

/// Column list for `events` queries.
const COLUMNS: &str = "\
    id, title, hole_count, default_time_filter, additional_time_filters, \
    is_published, show_on_main_leaderboard, event_date, created_at, updated_at";

pub struct EventRepo;

impl EventRepo {
    pub async fn find_by_id(pool: &PgPool, id: EventId) -> Result<Option<EventRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Published events flagged for the main leaderboard, most recent first.
    pub async fn list_leaderboard_events(pool: &PgPool) -> Result<Vec<EventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE is_published AND show_on_main_leaderboard \
             ORDER BY event_date DESC NULLS LAST, created_at, id"
        );
        sqlx::query_as::<_, EventRow>(&query).fetch_all(pool).await
    }
}

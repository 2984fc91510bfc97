//! Event metadata model.

use leaderboard_core::board::EventMeta;
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::{EventId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventRow {
    pub id: EventId,
    pub title: String,
    pub hole_count: i32,
    pub default_time_filter: String,
    pub additional_time_filters: Vec<String>,
    pub is_published: bool,
    pub show_on_main_leaderboard: bool,
    pub event_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EventRow {
    /// Convert to the core type. Unknown filter names fall back to
    /// `all_time` (with a warning) rather than hiding the event.
    pub fn into_meta(self) -> EventMeta {
        EventMeta {
            id: self.id,
            title: self.title,
            hole_count: usize::try_from(self.hole_count).unwrap_or(0),
            default_time_filter: TimeFilter::parse_or_default(&self.default_time_filter),
            additional_time_filters: self
                .additional_time_filters
                .iter()
                .map(|f| TimeFilter::parse_or_default(f))
                .collect(),
            is_published: self.is_published,
            show_on_main_leaderboard: self.show_on_main_leaderboard,
            event_date: self.event_date,
        }
    }
}

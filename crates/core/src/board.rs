//! Display boards and the event metadata they are synthesized from.

use serde::{Deserialize, Serialize};

use crate::time_filter::TimeFilter;
use crate::types::{EventId, Timestamp};

/// Read-only event metadata the leaderboard engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub id: EventId,
    pub title: String,
    pub hole_count: usize,
    pub default_time_filter: TimeFilter,
    /// Extra filters shown after the default, in configured order.
    pub additional_time_filters: Vec<TimeFilter>,
    pub is_published: bool,
    pub show_on_main_leaderboard: bool,
    pub event_date: Option<Timestamp>,
}

impl EventMeta {
    /// Default filter first, then additional filters with duplicates dropped.
    pub fn time_filters(&self) -> Vec<TimeFilter> {
        let mut filters = vec![self.default_time_filter];
        for filter in &self.additional_time_filters {
            if !filters.contains(filter) {
                filters.push(*filter);
            }
        }
        filters
    }
}

/// One rotatable (event, time filter) view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardBoard {
    pub id: String,
    pub event_id: EventId,
    pub time_filter: TimeFilter,
    pub title: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

impl LeaderboardBoard {
    pub fn new(event_id: EventId, time_filter: TimeFilter) -> Self {
        Self {
            id: board_id(event_id, time_filter),
            event_id,
            time_filter,
            title: None,
            priority: None,
            is_active: None,
        }
    }
}

pub fn board_id(event_id: EventId, time_filter: TimeFilter) -> String {
    format!("{event_id}:{time_filter}")
}

/// Boards for every published event flagged for the main leaderboard, one
/// per configured filter, titled "<event title> - <filter label>".
pub fn boards_for_events(events: &[EventMeta]) -> Vec<LeaderboardBoard> {
    events
        .iter()
        .filter(|e| e.is_published && e.show_on_main_leaderboard)
        .flat_map(|event| {
            event
                .time_filters()
                .into_iter()
                .enumerate()
                .map(move |(i, filter)| LeaderboardBoard {
                    title: Some(format!("{} - {}", event.title, filter.label())),
                    priority: Some(i as i32),
                    is_active: Some(true),
                    ..LeaderboardBoard::new(event.id, filter)
                })
        })
        .collect()
}

//! Handlers for leaderboards, boards and time filters.

use axum::extract::{Path, Query, State};
use axum::Json;
use leaderboard_core::board::{boards_for_events, LeaderboardBoard};
use leaderboard_core::scoring::PlayerTotalScore;
use leaderboard_core::snapshot::LeaderboardSnapshot;
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::EventId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// A selectable filter with its display label.
#[derive(Debug, Serialize)]
pub struct TimeFilterOption {
    pub value: TimeFilter,
    pub label: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub filter: Option<String>,
}

/// Where a leaderboard response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrigin {
    Snapshot,
    Computed,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub event_id: EventId,
    pub time_filter: TimeFilter,
    pub label: &'static str,
    pub origin: ScoreOrigin,
    pub scores: Vec<PlayerTotalScore>,
}

/// GET /api/v1/time-filters
pub async fn list_time_filters() -> Json<DataResponse<Vec<TimeFilterOption>>> {
    let data = TimeFilter::ALL
        .into_iter()
        .map(|value| TimeFilterOption {
            value,
            label: value.label(),
        })
        .collect();
    Json(DataResponse { data })
}

/// GET /api/v1/boards
pub async fn list_boards(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<LeaderboardBoard>>>> {
    let events = state.snapshots.list_events().await?;
    Ok(Json(DataResponse {
        data: boards_for_events(&events),
    }))
}

/// GET /api/v1/events/{event_id}/leaderboard?filter=...
///
/// Serves the stored snapshot when it validates, otherwise computes the
/// ranking from raw rows without persisting it. Unknown filters fall back
/// to `all_time`.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<DataResponse<LeaderboardResponse>>> {
    let time_filter = query
        .filter
        .as_deref()
        .map(TimeFilter::parse_or_default)
        .unwrap_or_default();

    let (origin, scores) = match state.snapshots.fetch(event_id, time_filter).await? {
        Some(scores) => (ScoreOrigin::Snapshot, scores),
        None => (
            ScoreOrigin::Computed,
            state.snapshots.compute(event_id, time_filter).await?,
        ),
    };

    Ok(Json(DataResponse {
        data: LeaderboardResponse {
            event_id,
            time_filter,
            label: time_filter.label(),
            origin,
            scores,
        },
    }))
}

/// POST /api/v1/events/{event_id}/leaderboard/{filter}/refresh
///
/// Recomputes, persists and publishes the snapshot. The filter must be a
/// known name.
pub async fn refresh_leaderboard(
    State(state): State<AppState>,
    Path((event_id, filter)): Path<(EventId, String)>,
) -> AppResult<Json<DataResponse<LeaderboardSnapshot>>> {
    let time_filter: TimeFilter = filter
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown time filter '{filter}'")))?;

    let snapshot = state.refresher.refresh(event_id, time_filter).await?;
    tracing::info!(
        event_id = %event_id,
        time_filter = %time_filter,
        entries = snapshot.scores.len(),
        "Leaderboard refreshed on request",
    );

    Ok(Json(DataResponse { data: snapshot }))
}

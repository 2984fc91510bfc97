//! Route definitions for leaderboards and boards.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::leaderboard;
use crate::state::AppState;

/// Routes mounted at the `/api/v1` root.
///
/// ```text
/// GET    /time-filters                                  -> list_time_filters
/// GET    /boards                                        -> list_boards
/// GET    /events/{event_id}/leaderboard?filter=         -> get_leaderboard
/// POST   /events/{event_id}/leaderboard/{filter}/refresh -> refresh_leaderboard
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/time-filters", get(leaderboard::list_time_filters))
        .route("/boards", get(leaderboard::list_boards))
        .route(
            "/events/{event_id}/leaderboard",
            get(leaderboard::get_leaderboard),
        )
        .route(
            "/events/{event_id}/leaderboard/{filter}/refresh",
            post(leaderboard::refresh_leaderboard),
        )
}

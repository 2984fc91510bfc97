pub mod health;
pub mod leaderboard;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                               display WebSocket
/// /time-filters                                     filter names and labels
/// /boards                                           rotatable boards
/// /events/{event_id}/leaderboard                    current ranking
/// /events/{event_id}/leaderboard/{filter}/refresh   recompute + publish (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(leaderboard::router())
}

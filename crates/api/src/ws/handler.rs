use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use leaderboard_core::changes::{SnapshotChange, SNAPSHOTS_TOPIC};
use leaderboard_core::snapshot::Checked;
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::EventId;
use leaderboard_events::{ChangeBus, ChangeNotification};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::state::AppState;

/// Interval between server pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Optional narrowing of the pushed changes.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct WsQuery {
    pub event_id: Option<EventId>,
    pub filter: Option<String>,
}

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.bus, query))
}

/// Forward bus changes to the socket until either side closes.
async fn handle_socket(socket: WebSocket, bus: Arc<ChangeBus>, query: WsQuery) {
    let conn_id = uuid::Uuid::new_v4();
    tracing::info!(conn_id = %conn_id, event_id = ?query.event_id, "WebSocket connected");

    let time_filter = query.filter.as_deref().map(TimeFilter::parse_or_default);
    let mut changes = bus.subscribe();
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            let message = tokio::select! {
                _ = heartbeat.tick() => Message::Ping(Default::default()),
                received = changes.recv() => match received {
                    Ok(notification) => {
                        match snapshot_frame(&notification, query.event_id, time_filter) {
                            Some(frame) => Message::Text(frame.into()),
                            None => continue,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(conn_id = %conn_id, skipped, "WebSocket client lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            if sink.send(message).await.is_err() {
                tracing::debug!(conn_id = %conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Text frame for a snapshot change, or `None` when the notification is
/// not a valid snapshot change for the requested event and filter.
pub fn snapshot_frame(
    notification: &ChangeNotification,
    event_id: Option<EventId>,
    time_filter: Option<TimeFilter>,
) -> Option<String> {
    if notification.topic != SNAPSHOTS_TOPIC {
        return None;
    }

    let change = match SnapshotChange::parse(&notification.payload) {
        Checked::Valid(change) => change,
        Checked::Invalid(reason) => {
            tracing::debug!(reason = %reason, "Dropping invalid snapshot change");
            return None;
        }
    };

    if event_id.is_some_and(|id| id != change.event_id)
        || time_filter.is_some_and(|f| f != change.time_filter)
    {
        return None;
    }

    Some(
        json!({
            "type": "leaderboard_snapshot",
            "data": change.to_payload(),
        })
        .to_string(),
    )
}

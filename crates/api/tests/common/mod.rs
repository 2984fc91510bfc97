#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use leaderboard_core::snapshot_store::SnapshotStoreConfig;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use uuid::Uuid;

use leaderboard_api::config::ServerConfig;
use leaderboard_api::routes;
use leaderboard_api::state::AppState;
use leaderboard_events::ChangeBus;

/// A `ServerConfig` with development defaults. The database URL is unused:
/// tests hand in the pool directly.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "postgres://unused".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        snapshots: SnapshotStoreConfig::default(),
    }
}

/// Build the full application router with the production middleware stack.
///
/// Returns the state too so tests can observe the change bus.
pub fn build_test_app(pool: PgPool) -> (Router, AppState) {
    let state = AppState::new(pool, test_config(), Arc::new(ChangeBus::default()));

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state.clone());

    (app, state)
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Insert an event and return its id.
pub async fn seed_event(
    pool: &PgPool,
    title: &str,
    hole_count: i32,
    additional_filters: &[&str],
    is_published: bool,
) -> Uuid {
    let filters: Vec<String> = additional_filters.iter().map(|f| f.to_string()).collect();
    sqlx::query_scalar(
        "INSERT INTO events \
            (title, hole_count, additional_time_filters, is_published, show_on_main_leaderboard) \
         VALUES ($1, $2, $3, $4, TRUE) \
         RETURNING id",
    )
    .bind(title)
    .bind(hole_count)
    .bind(&filters)
    .bind(is_published)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_score(pool: &PgPool, event_id: Uuid, player: &str, hole: i32, score: i32) {
    sqlx::query(
        "INSERT INTO player_hole_scores (event_id, player_id, name, hole_number, score) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(event_id)
    .bind(player)
    .bind(player)
    .bind(hole)
    .bind(score)
    .execute(pool)
    .await
    .unwrap();
}

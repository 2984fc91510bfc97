//! Integration tests for the leaderboard repositories and the port adapter.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use leaderboard_core::pending_writes::PendingScoreWrite;
use leaderboard_core::ports::{EventCatalog, ScoreSource, ScoreWriter, ScoreQuery};
use leaderboard_core::snapshot_store::{SnapshotStore, SnapshotStoreConfig};
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_core::types::{EventId, Timestamp};
use leaderboard_db::models::score::CreateScore;
use leaderboard_db::repositories::{EventRepo, ScoreRepo, SnapshotRepo};
use leaderboard_db::PgLeaderboardStore;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

async fn insert_event(pool: &PgPool, title: &str, published: bool, main: bool) -> EventId {
    sqlx::query_scalar(
        "INSERT INTO events \
            (title, hole_count, default_time_filter, additional_time_filters, \
             is_published, show_on_main_leaderboard) \
         VALUES ($1, 2, 'all_time', ARRAY['last_hour', 'bogus'], $2, $3) \
         RETURNING id",
    )
    .bind(title)
    .bind(published)
    .bind(main)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn score(event_id: EventId, player: &str, hole: i32, value: i32, minutes_ago: i64) -> CreateScore {
    CreateScore {
        client_id: None,
        event_id,
        player_id: player.to_string(),
        name: player.to_uppercase(),
        hole_number: hole,
        score: Some(value),
        is_published: true,
        created_at: Some(now() - Duration::minutes(minutes_ago)),
    }
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn health_check_succeeds(pool: PgPool) {
    leaderboard_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn list_for_event_applies_cutoff_and_publication(pool: PgPool) {
    let event_id = insert_event(&pool, "Open", true, true).await;
    ScoreRepo::insert_idempotent(&pool, &score(event_id, "old", 1, 2, 120)).await.unwrap();
    ScoreRepo::insert_idempotent(&pool, &score(event_id, "edge", 1, 2, 60)).await.unwrap();
    let mut hidden = score(event_id, "hidden", 1, 2, 5);
    hidden.is_published = false;
    ScoreRepo::insert_idempotent(&pool, &hidden).await.unwrap();

    let cutoff = Some(now() - Duration::hours(1));
    let published = ScoreRepo::list_for_event(&pool, event_id, cutoff, true).await.unwrap();
    let everything = ScoreRepo::list_for_event(&pool, event_id, None, false).await.unwrap();

    let ids: Vec<_> = published.iter().filter_map(|r| r.player_id.as_deref()).collect();
    assert_eq!(ids, ["edge"]);
    assert_eq!(everything.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_idempotent_skips_duplicate_client_ids(pool: PgPool) {
    let event_id = insert_event(&pool, "Open", true, true).await;
    let mut input = score(event_id, "p1", 1, 3, 1);
    input.client_id = Some(Uuid::new_v4());

    let first = ScoreRepo::insert_idempotent(&pool, &input).await.unwrap();
    let second = ScoreRepo::insert_idempotent(&pool, &input).await.unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    let rows = ScoreRepo::list_for_event(&pool, event_id, None, false).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn snapshot_upsert_keeps_one_row_per_key(pool: PgPool) {
    let event_id = insert_event(&pool, "Open", true, true).await;

    SnapshotRepo::upsert(&pool, event_id, "all_time", &json!([]), now()).await.unwrap();
    let later = now() + Duration::minutes(1);
    SnapshotRepo::upsert(&pool, event_id, "all_time", &json!([{"x": 1}]), later)
        .await
        .unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leaderboard_snapshots")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);

    let row = SnapshotRepo::find(&pool, event_id, "all_time").await.unwrap().unwrap();
    assert_eq!(row.scores, json!([{"x": 1}]));
    assert_eq!(row.updated_at, later);
}

#[sqlx::test(migrations = "./migrations")]
async fn leaderboard_events_exclude_hidden_ones(pool: PgPool) {
    let shown = insert_event(&pool, "Shown", true, true).await;
    insert_event(&pool, "Draft", false, true).await;
    insert_event(&pool, "Side", true, false).await;

    let rows = EventRepo::list_leaderboard_events(&pool).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, shown);
}

// ---------------------------------------------------------------------------
// Port adapter
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn event_meta_drops_unknown_filters_to_all_time(pool: PgPool) {
    let event_id = insert_event(&pool, "Open", true, true).await;
    let store = PgLeaderboardStore::new(pool);

    let meta = store.find_event(event_id).await.unwrap().unwrap();

    assert_eq!(meta.hole_count, 2);
    assert_eq!(meta.time_filters(), vec![TimeFilter::AllTime, TimeFilter::LastHour]);
}

#[sqlx::test(migrations = "./migrations")]
async fn snapshot_store_round_trips_through_postgres(pool: PgPool) {
    let event_id = insert_event(&pool, "Open", true, true).await;
    for input in [
        score(event_id, "p1", 1, 1, 4),
        score(event_id, "p1", 2, 2, 3),
        score(event_id, "p2", 1, 1, 2),
        score(event_id, "p2", 2, 1, 1),
    ] {
        ScoreRepo::insert_idempotent(&pool, &input).await.unwrap();
    }

    let pg = Arc::new(PgLeaderboardStore::new(pool));
    let store = SnapshotStore::new(pg.clone(), pg.clone(), pg, SnapshotStoreConfig::default());

    let snapshot = store.refresh_at(event_id, TimeFilter::AllTime, now()).await.unwrap();
    let fetched = store.fetch(event_id, TimeFilter::AllTime).await.unwrap().unwrap();

    assert_eq!(fetched, snapshot.scores);
    assert_eq!(fetched[0].player_id, "p2");
    assert_eq!(fetched[0].total_score, 2);
    assert_eq!(fetched[1].scores, vec![Some(1), Some(2)]);
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_snapshot_payload_reads_as_none(pool: PgPool) {
    let event_id = insert_event(&pool, "Open", true, true).await;
    SnapshotRepo::upsert(
        &pool,
        event_id,
        "last_day",
        &json!([{ "player_id": "p1", "name": "P1" }]),
        now(),
    )
    .await
    .unwrap();

    let pg = Arc::new(PgLeaderboardStore::new(pool));
    let store = SnapshotStore::new(pg.clone(), pg.clone(), pg, SnapshotStoreConfig::default());

    assert_eq!(store.fetch(event_id, TimeFilter::LastDay).await.unwrap(), None);
}

#[sqlx::test(migrations = "./migrations")]
async fn write_score_is_idempotent_by_client_id(pool: PgPool) {
    let event_id = insert_event(&pool, "Open", true, true).await;
    let store = PgLeaderboardStore::new(pool);
    let write = PendingScoreWrite {
        client_id: Uuid::new_v4(),
        event_id,
        player_id: "p1".to_string(),
        name: "Alice".to_string(),
        hole_number: 1,
        score: Some(2),
        recorded_at: now(),
    };

    store.write_score(&write).await.unwrap();
    store.write_score(&write).await.unwrap();

    let rows = store
        .list_scores(&ScoreQuery {
            event_id,
            since: None,
            published_only: true,
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].created_at, now());
}

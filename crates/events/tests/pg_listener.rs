//! The LISTEN bridge republishes trigger notifications on the bus.

use std::sync::Arc;
use std::time::Duration;

use leaderboard_core::changes::{ChangeKind, ScoreRowChange, SCORES_TOPIC};
use leaderboard_events::{ChangeBus, PgChangeListener};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

async fn seed_event(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO events (title, hole_count) VALUES ('Listener', 9) RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn score_inserts_reach_the_bus(pool: PgPool) {
    let event_id = seed_event(&pool).await;
    let bus = Arc::new(ChangeBus::default());
    let mut changes = bus.subscribe();
    let cancel = CancellationToken::new();

    let listener = PgChangeListener::new(pool.clone(), Arc::clone(&bus));
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { listener.run(cancel).await })
    };

    // The listener connects asynchronously; keep inserting until one lands.
    let received = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            sqlx::query(
                "INSERT INTO player_hole_scores (event_id, player_id, name, hole_number, score) \
                 VALUES ($1, 'p1', 'Alice', 1, 3)",
            )
            .bind(event_id)
            .execute(&pool)
            .await
            .unwrap();

            if let Ok(Ok(change)) =
                tokio::time::timeout(Duration::from_millis(250), changes.recv()).await
            {
                return change;
            }
        }
    })
    .await
    .expect("notification received");

    assert_eq!(received.topic, SCORES_TOPIC);
    let parsed = ScoreRowChange::parse(&received.payload).valid().unwrap();
    assert_eq!(parsed.kind, ChangeKind::Insert);
    assert_eq!(parsed.event_id, event_id);
    assert_eq!(parsed.row.score, Some(3));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("listener stops")
        .unwrap();
}

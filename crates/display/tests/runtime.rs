//! End-to-end behaviour of the board runtime over the in-memory store and
//! an in-process change bus.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leaderboard_core::board::{boards_for_events, EventMeta};
use leaderboard_core::changes::SNAPSHOTS_TOPIC;
use leaderboard_core::memory::InMemoryLeaderboardStore;
use leaderboard_core::scoring::PlayerHoleScore;
use leaderboard_core::snapshot_store::{SnapshotStore, SnapshotStoreConfig};
use leaderboard_core::time_filter::TimeFilter;
use leaderboard_display::{BoardRuntime, BoardView, RuntimeConfig};
use leaderboard_events::{ChangeBus, ChangeNotification, RealtimeFeed};
use serde_json::json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    mem: Arc<InMemoryLeaderboardStore>,
    store: SnapshotStore,
    bus: Arc<ChangeBus>,
    runtime: BoardRuntime,
    event: EventMeta,
}

async fn harness() -> Harness {
    let mem = Arc::new(InMemoryLeaderboardStore::new());
    let event = EventMeta {
        id: Uuid::new_v4(),
        title: "Spring Classic".to_string(),
        hole_count: 2,
        default_time_filter: TimeFilter::AllTime,
        additional_time_filters: vec![TimeFilter::LastHour, TimeFilter::SinceStartOfDay],
        is_published: true,
        show_on_main_leaderboard: true,
        event_date: None,
    };
    mem.insert_event(event.clone()).await;

    let store = SnapshotStore::new(
        mem.clone(),
        mem.clone(),
        mem.clone(),
        SnapshotStoreConfig::default(),
    );
    let bus = Arc::new(ChangeBus::default());
    let feed = RealtimeFeed::new(Arc::clone(&bus), Arc::new(store.clone()));

    Harness {
        mem,
        store,
        bus,
        runtime: BoardRuntime::new(feed),
        event,
    }
}

fn row(player: &str, score: i32, hole: i32) -> PlayerHoleScore {
    PlayerHoleScore {
        player_id: Some(player.to_string()),
        name: player.to_string(),
        score: Some(score),
        hole_number: Some(hole),
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// Wait until the active board satisfies `pred`.
async fn wait_for_active(runtime: &BoardRuntime, pred: impl Fn(&BoardView) -> bool) -> BoardView {
    let mut changes = runtime.changes();
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            if let Some(view) = runtime.active_board().filter(|v| pred(v)) {
                return view;
            }
            changes.changed().await.expect("runtime alive");
        }
    })
    .await
    .expect("condition reached")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn active_board_receives_initial_scores() {
    let h = harness().await;
    for r in [row("p1", 1, 1), row("p1", 2, 2), row("p2", 1, 1), row("p2", 1, 2)] {
        h.mem.insert_row(h.event.id, r, true).await;
    }
    h.store.refresh(h.event.id, TimeFilter::AllTime).await.unwrap();

    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_enabled: false,
        ..Default::default()
    });
    h.runtime.set_boards(boards_for_events(&[h.event.clone()]));

    let view = wait_for_active(&h.runtime, |v| v.scores.is_some()).await;
    let scores = view.scores.unwrap();
    assert_eq!(scores[0].player_id, "p2");
    assert_eq!(scores[1].player_id, "p1");
    assert!(!view.loading);
    assert!(view.last_updated.is_some());
}

#[tokio::test]
async fn missing_snapshot_delivers_empty_state() {
    let h = harness().await;
    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_enabled: false,
        ..Default::default()
    });
    h.runtime.set_boards(boards_for_events(&[h.event.clone()]));

    let view = wait_for_active(&h.runtime, |v| !v.loading).await;
    assert_eq!(view.scores, None);
    assert_eq!(view.error, None);
}

#[tokio::test]
async fn errors_keep_last_good_scores() {
    let h = harness().await;
    h.mem.insert_row(h.event.id, row("p1", 3, 1), true).await;
    h.store.refresh(h.event.id, TimeFilter::AllTime).await.unwrap();

    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_enabled: false,
        ..Default::default()
    });
    h.runtime.set_boards(boards_for_events(&[h.event.clone()]));
    wait_for_active(&h.runtime, |v| v.scores.is_some()).await;

    h.bus.publish(ChangeNotification::new(
        SNAPSHOTS_TOPIC,
        json!({
            "event_id": h.event.id,
            "time_filter": "all_time",
            "scores": [{ "player_id": "p9" }],
        }),
    ));

    let view = wait_for_active(&h.runtime, |v| v.error.is_some()).await;
    assert_eq!(view.scores.unwrap()[0].player_id, "p1");
}

#[tokio::test]
async fn live_updates_replace_active_board_scores() {
    let h = harness().await;
    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_enabled: false,
        ..Default::default()
    });
    h.runtime.set_boards(boards_for_events(&[h.event.clone()]));
    wait_for_active(&h.runtime, |v| !v.loading).await;

    h.mem.insert_row(h.event.id, row("late", 2, 1), true).await;
    let snapshot = h.store.refresh(h.event.id, TimeFilter::AllTime).await.unwrap();
    h.bus.publish_snapshot(&snapshot);

    let view = wait_for_active(&h.runtime, |v| v.scores.as_ref().is_some_and(|s| !s.is_empty())).await;
    assert_eq!(view.scores.unwrap()[0].player_id, "late");
}

#[tokio::test(start_paused = true)]
async fn timer_rotates_through_boards() {
    let h = harness().await;
    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_interval: Duration::from_secs(5),
        rotation_enabled: true,
    });
    let boards = boards_for_events(&[h.event.clone()]);
    h.runtime.set_boards(boards.clone());
    assert_eq!(h.runtime.status().active_board_id.as_deref(), Some(boards[0].id.as_str()));

    tokio::time::sleep(Duration::from_millis(5_300)).await;
    assert_eq!(h.runtime.status().active_board_id.as_deref(), Some(boards[1].id.as_str()));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.runtime.status().active_board_id.as_deref(), Some(boards[0].id.as_str()));

    let status = h.runtime.status();
    assert!(status.is_rotating);
    assert!(status.time_until_rotation <= Duration::from_secs(5));
    assert_eq!(status.board_count, 3);
}

#[tokio::test(start_paused = true)]
async fn manual_switch_restarts_the_interval() {
    let h = harness().await;
    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_interval: Duration::from_secs(10),
        rotation_enabled: true,
    });
    let boards = boards_for_events(&[h.event.clone()]);
    h.runtime.set_boards(boards.clone());

    tokio::time::sleep(Duration::from_secs(8)).await;
    assert!(h.runtime.set_active_board(&boards[2].id));
    assert_eq!(h.runtime.status().time_until_rotation, Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(h.runtime.status().active_board_id.as_deref(), Some(boards[2].id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn single_board_rotation_only_resets_the_timestamp() {
    let h = harness().await;
    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_enabled: false,
        ..Default::default()
    });
    let board = boards_for_events(&[h.event.clone()]).remove(0);
    h.runtime.set_boards(vec![board.clone()]);
    let first = h.runtime.activated_at().unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    std::thread::sleep(Duration::from_millis(2));
    assert_eq!(h.runtime.rotate_to_next().as_deref(), Some(board.id.as_str()));

    assert!(h.runtime.activated_at().unwrap() > first);
    assert_eq!(h.runtime.status().board_count, 1);
}

#[tokio::test(start_paused = true)]
async fn paused_rotation_holds_the_current_board() {
    let h = harness().await;
    let _teardown = h.runtime.initialize(RuntimeConfig {
        rotation_interval: Duration::from_secs(2),
        rotation_enabled: true,
    });
    let boards = boards_for_events(&[h.event.clone()]);
    h.runtime.set_boards(boards.clone());

    h.runtime.pause_rotation();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let status = h.runtime.status();
    assert!(!status.is_rotating);
    assert_eq!(status.active_board_id.as_deref(), Some(boards[0].id.as_str()));
}

#[tokio::test]
async fn teardown_resets_everything() {
    let h = harness().await;
    let teardown = h.runtime.initialize(RuntimeConfig::default());
    h.runtime.set_boards(boards_for_events(&[h.event.clone()]));
    assert!(h.runtime.is_initialized());

    teardown.teardown();

    let status = h.runtime.status();
    assert!(!h.runtime.is_initialized());
    assert_eq!(status.active_board_id, None);
    assert_eq!(status.board_count, 0);
    assert!(!status.is_rotating);
}

//! Parsing of realtime change notifications.
//!
//! Notifications arrive as untyped JSON on a named topic. Routing keys are
//! read first so a subscriber can ignore other keys without paying for (or
//! reporting) a full parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scoring::{PlayerHoleScore, PlayerTotalScore};
use crate::snapshot::{validate_scores, Checked};
use crate::time_filter::TimeFilter;
use crate::types::{EventId, Timestamp};

/// Topic carrying `{ event_id, time_filter, scores }` snapshot changes.
pub const SNAPSHOTS_TOPIC: &str = "leaderboard_snapshots";

/// Topic carrying `{ eventType, row }` raw score row changes.
pub const SCORES_TOPIC: &str = "player_hole_scores";

// ---------------------------------------------------------------------------
// Snapshot changes
// ---------------------------------------------------------------------------

/// A snapshot was rewritten; carries the full replacement score list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotChange {
    pub event_id: EventId,
    pub time_filter: TimeFilter,
    pub scores: Vec<PlayerTotalScore>,
}

/// Routing key of a snapshot change, if one can be read.
///
/// The filter is returned as its raw name; subscribers match it against
/// their own filter's wire name, so changes for unknown filters match no
/// subscriber and are ignored.
pub fn snapshot_key(payload: &Value) -> Option<(EventId, &str)> {
    let event_id = payload.get("event_id")?.as_str()?.parse().ok()?;
    let filter = payload.get("time_filter")?.as_str()?;
    Some((event_id, filter))
}

impl SnapshotChange {
    pub fn parse(payload: &Value) -> Checked<Self> {
        let Some((event_id, filter)) = snapshot_key(payload) else {
            return Checked::Invalid("snapshot change has no event_id/time_filter".to_string());
        };
        let time_filter = match filter.parse::<TimeFilter>() {
            Ok(f) => f,
            Err(e) => return Checked::Invalid(e.to_string()),
        };
        let Some(scores) = payload.get("scores") else {
            return Checked::Invalid("snapshot change has no scores".to_string());
        };

        validate_scores(scores).map(|scores| Self {
            event_id,
            time_filter,
            scores,
        })
    }

    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "event_id": self.event_id,
            "time_filter": self.time_filter,
            "scores": self.scores,
        })
    }
}

// ---------------------------------------------------------------------------
// Score row changes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A raw score row was inserted, updated or deleted.
///
/// For deletes `row` is the row as it was before removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRowChange {
    pub kind: ChangeKind,
    pub event_id: EventId,
    pub row: PlayerHoleScore,
}

#[derive(Deserialize)]
struct RawRowChange {
    #[serde(rename = "eventType")]
    kind: ChangeKind,
    row: RawRow,
}

#[derive(Deserialize)]
struct RawRow {
    event_id: EventId,
    player_id: Option<String>,
    #[serde(default)]
    name: String,
    score: Option<i32>,
    hole_number: Option<i32>,
    created_at: Timestamp,
    updated_at: Option<Timestamp>,
}

/// Event id of a score row change, if one can be read.
pub fn score_row_event(payload: &Value) -> Option<EventId> {
    payload.get("row")?.get("event_id")?.as_str()?.parse().ok()
}

impl ScoreRowChange {
    pub fn parse(payload: &Value) -> Checked<Self> {
        match RawRowChange::deserialize(payload) {
            Ok(raw) => Checked::Valid(Self {
                kind: raw.kind,
                event_id: raw.row.event_id,
                row: PlayerHoleScore {
                    player_id: raw.row.player_id,
                    name: raw.row.name,
                    score: raw.row.score,
                    hole_number: raw.row.hole_number,
                    created_at: raw.row.created_at,
                    updated_at: raw.row.updated_at,
                },
            }),
            Err(e) => Checked::Invalid(format!("score row change: {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Score aggregation: raw per-hole rows to ranked per-player totals.
//!
//! Everything here is synchronous and side-effect free apart from logging
//! skipped rows. Time filtering happens before rows reach this module (see
//! [`crate::time_filter`]).

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::{PlayerId, Timestamp};

/// Number of entries kept in a persisted snapshot.
pub const SNAPSHOT_TOP_N: usize = 10;

// ---------------------------------------------------------------------------
// Row and total types
// ---------------------------------------------------------------------------

/// One recorded score for one player on one hole.
///
/// `player_id` is optional because rows arrive from loosely typed sources;
/// rows without one are skipped during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHoleScore {
    pub player_id: Option<PlayerId>,
    pub name: String,
    /// `None` means the hole has not been played yet.
    pub score: Option<i32>,
    /// 1-based.
    pub hole_number: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl PlayerHoleScore {
    /// Latest of `created_at` and `updated_at`.
    pub fn touched_at(&self) -> Timestamp {
        match self.updated_at {
            Some(updated) if updated > self.created_at => updated,
            _ => self.created_at,
        }
    }
}

/// A player's aggregate over every hole inside one time window.
///
/// The JSON field names match the persisted snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTotalScore {
    pub player_id: PlayerId,
    pub name: String,
    #[serde(rename = "totalScore")]
    pub total_score: i64,
    #[serde(rename = "holeInOnes")]
    pub hole_in_ones: u32,
    /// Indexed by `hole_number - 1`; always `hole_count` long.
    pub scores: Vec<Option<i32>>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Timestamp,
}

/// Counts of rows dropped by [`aggregate_rows`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkippedRows {
    pub missing_player: usize,
    /// Rows whose hole number is absent or outside `[1, hole_count]`.
    pub out_of_range_hole: usize,
}

impl SkippedRows {
    pub fn total(&self) -> usize {
        self.missing_player + self.out_of_range_hole
    }
}

/// Output of [`aggregate_rows`]: unsorted totals plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub totals: Vec<PlayerTotalScore>,
    pub skipped: SkippedRows,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// A filled hole slot; the most recently touched row wins.
#[derive(Clone, Copy)]
struct Slot {
    score: Option<i32>,
    at: Timestamp,
}

struct PlayerAccumulator {
    name: String,
    slots: Vec<Option<Slot>>,
    last_updated: Timestamp,
}

/// Group rows by player and build one [`PlayerTotalScore`] per player.
///
/// Rows without a player id and rows whose hole number cannot be placed are
/// excluded from every figure, so `total_score` always equals the sum of the
/// positional `scores`. When the same hole appears twice for a player, the
/// most recently touched row wins.
pub fn aggregate_rows(rows: &[PlayerHoleScore], hole_count: usize) -> Aggregation {
    let mut skipped = SkippedRows::default();
    let mut players: IndexMap<&str, PlayerAccumulator> = IndexMap::new();

    for row in rows {
        let Some(player_id) = row.player_id.as_deref().filter(|id| !id.is_empty()) else {
            skipped.missing_player += 1;
            continue;
        };

        let Some(index) = hole_index(row.hole_number, hole_count) else {
            skipped.out_of_range_hole += 1;
            continue;
        };

        let at = row.touched_at();
        let acc = players.entry(player_id).or_insert_with(|| PlayerAccumulator {
            name: row.name.clone(),
            slots: vec![None; hole_count],
            last_updated: at,
        });

        if at >= acc.last_updated {
            acc.last_updated = at;
            acc.name.clone_from(&row.name);
        }

        let slot = &mut acc.slots[index];
        if slot.map_or(true, |s| s.at <= at) {
            *slot = Some(Slot { score: row.score, at });
        }
    }

    let totals = players
        .into_iter()
        .map(|(player_id, acc)| {
            let scores: Vec<Option<i32>> = acc.slots.iter().map(|s| s.and_then(|s| s.score)).collect();
            PlayerTotalScore {
                player_id: player_id.to_string(),
                name: acc.name,
                total_score: scores.iter().flatten().map(|&s| i64::from(s)).sum(),
                hole_in_ones: scores.iter().flatten().filter(|&&s| s == 1).count() as u32,
                scores,
                last_updated: acc.last_updated,
            }
        })
        .collect();

    Aggregation { totals, skipped }
}

/// [`aggregate_rows`] that logs skipped rows and returns only the totals.
pub fn aggregate(rows: &[PlayerHoleScore], hole_count: usize) -> Vec<PlayerTotalScore> {
    let Aggregation { totals, skipped } = aggregate_rows(rows, hole_count);
    if skipped.total() > 0 {
        tracing::warn!(
            missing_player = skipped.missing_player,
            out_of_range_hole = skipped.out_of_range_hole,
            hole_count,
            "Skipped malformed score rows during aggregation",
        );
    }
    totals
}

fn hole_index(hole_number: Option<i32>, hole_count: usize) -> Option<usize> {
    let hole = usize::try_from(hole_number?).ok()?;
    (1..=hole_count).contains(&hole).then(|| hole - 1)
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Leaderboard order: lower total first, then more hole-in-ones, then name.
pub fn rank_order(a: &PlayerTotalScore, b: &PlayerTotalScore) -> Ordering {
    a.total_score
        .cmp(&b.total_score)
        .then_with(|| b.hole_in_ones.cmp(&a.hole_in_ones))
        .then_with(|| compare_names(&a.name, &b.name))
}

/// Collation order for display names: base letters first, then accents,
/// then case. Names differing only in case still get a fixed order.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        .then_with(|| a.cmp(b))
}

fn base_letters(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn folded(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd().flat_map(char::to_lowercase)
}

/// Sort into leaderboard order. Stable, so perfect ties keep input order.
pub fn sort_scores(mut scores: Vec<PlayerTotalScore>) -> Vec<PlayerTotalScore> {
    scores.sort_by(rank_order);
    scores
}

/// Sort, then keep the first `n`.
pub fn top_n(scores: Vec<PlayerTotalScore>, n: usize) -> Vec<PlayerTotalScore> {
    let mut sorted = sort_scores(scores);
    sorted.truncate(n);
    sorted
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

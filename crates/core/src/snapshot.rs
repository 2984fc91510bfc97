//! Persisted leaderboard snapshots and the shape check applied to
//! untyped snapshot payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::scoring::PlayerTotalScore;
use crate::time_filter::TimeFilter;
use crate::types::{EventId, Timestamp};

/// A validated, ranked top-N leaderboard for one (event, filter) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub event_id: EventId,
    pub time_filter: TimeFilter,
    pub scores: Vec<PlayerTotalScore>,
    pub updated_at: Timestamp,
}

/// A snapshot row as stored: the score payload is still raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub event_id: EventId,
    pub time_filter: TimeFilter,
    pub payload: Value,
    pub updated_at: Timestamp,
}

impl StoredSnapshot {
    /// Validate the payload into a [`LeaderboardSnapshot`].
    pub fn check(&self) -> Checked<LeaderboardSnapshot> {
        validate_scores(&self.payload).map(|scores| LeaderboardSnapshot {
            event_id: self.event_id,
            time_filter: self.time_filter,
            scores,
            updated_at: self.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Checked
// ---------------------------------------------------------------------------

/// Outcome of validating untyped input.
#[derive(Debug, Clone, PartialEq)]
pub enum Checked<T> {
    Valid(T),
    Invalid(String),
}

impl<T> Checked<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Checked<U> {
        match self {
            Self::Valid(v) => Checked::Valid(f(v)),
            Self::Invalid(reason) => Checked::Invalid(reason),
        }
    }

    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, CoreError> {
        match self {
            Self::Valid(v) => Ok(v),
            Self::Invalid(reason) => Err(CoreError::Validation(reason)),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a snapshot score array.
///
/// Fails closed: a single malformed element rejects the whole payload.
pub fn validate_scores(payload: &Value) -> Checked<Vec<PlayerTotalScore>> {
    let Some(items) = payload.as_array() else {
        return Checked::Invalid("scores payload is not an array".to_string());
    };

    let mut scores = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Err(reason) = check_shape(item) {
            return Checked::Invalid(format!("entry {index}: {reason}"));
        }
        match PlayerTotalScore::deserialize(item) {
            Ok(score) => scores.push(score),
            Err(e) => return Checked::Invalid(format!("entry {index}: {e}")),
        }
    }

    Checked::Valid(scores)
}

fn check_shape(item: &Value) -> Result<(), String> {
    let Some(obj) = item.as_object() else {
        return Err("not an object".to_string());
    };

    let field = |name: &str| obj.get(name).ok_or_else(|| format!("missing {name}"));

    for name in ["player_id", "name", "lastUpdated"] {
        if !field(name)?.is_string() {
            return Err(format!("{name} is not a string"));
        }
    }
    for name in ["totalScore", "holeInOnes"] {
        if !field(name)?.is_number() {
            return Err(format!("{name} is not a number"));
        }
    }

    let holes = field("scores")?
        .as_array()
        .ok_or_else(|| "scores is not an array".to_string())?;
    if !holes.iter().all(|h| h.is_null() || h.is_number()) {
        return Err("scores contains a non-numeric entry".to_string());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Observation results: one finalized recording session, never mutated.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded value for one observable or exercise.
///
/// Readers pick the accessor matching the observable's declared kind in the
/// sheet; a value of the wrong shape reads as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ObservedValue {
    /// Cumulative count for a counter.
    Count(u64),

    /// Elapsed whole seconds for a timer.
    Seconds(u64),

    /// Option label to number of times it was recorded.
    Tally(BTreeMap<String, u64>),

    /// Whether a session exercise was completed.
    Done(bool),
}

impl ObservedValue {
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn seconds(&self) -> Option<u64> {
        match self {
            Self::Seconds(s) => Some(*s),
            _ => None,
        }
    }

    pub fn tally(&self) -> Option<&BTreeMap<String, u64>> {
        match self {
            Self::Tally(t) => Some(t),
            _ => None,
        }
    }

    pub fn done(&self) -> Option<bool> {
        match self {
            Self::Done(d) => Some(*d),
            _ => None,
        }
    }
}

/// Observable (or exercise) identifier to recorded value.
///
/// A missing key means "not observed this session", which is not the same
/// as an explicit zero.
pub type ResultData = BTreeMap<String, ObservedValue>;

/// One completed recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationResult {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub sheet_id: Uuid,
    pub sport_id: Uuid,
    pub created_at: Timestamp,
    pub data: ResultData,
}

impl ObservationResult {
    pub fn value(&self, key: &str) -> Option<&ObservedValue> {
        self.data.get(key)
    }
}

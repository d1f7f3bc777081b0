//! Version records: one immutable row per recorded state transition.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The mutation a version record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionEvent {
    Create,
    Update,
    Destroy,
}

impl VersionEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "destroy" => Some(Self::Destroy),
            _ => None,
        }
    }

    /// Update and Destroy capture the pre-state; Create has none.
    pub fn carries_pre_state(self) -> bool {
        !matches!(self, Self::Create)
    }
}

impl fmt::Display for VersionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state transition of a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Store-assigned, strictly increasing. Breaks `created_at` ties.
    pub sequence: u64,
    pub item_type: String,
    pub item_id: i64,
    pub event: VersionEvent,
    /// JSON object of the attributes *before* the event. `None` for Create.
    pub attribute_payload: Option<String>,
    /// When the transition completed.
    pub created_at: DateTime<Utc>,
    pub whodunnit: Option<String>,
}

impl VersionRecord {
    /// Chronological order: `(created_at, sequence)` ascending.
    pub fn chronological(lhs: &Self, rhs: &Self) -> Ordering {
        lhs.created_at
            .cmp(&rhs.created_at)
            .then_with(|| lhs.sequence.cmp(&rhs.sequence))
    }

    /// Recorded strictly after `as_of`; a version at exactly `as_of` has
    /// already applied.
    pub fn is_after(&self, as_of: DateTime<Utc>) -> bool {
        self.created_at > as_of
    }

    /// The last instant at which this version's pre-state was current.
    /// Other versions sharing `created_at` fall after it regardless of
    /// `sequence`.
    pub fn instant_before(&self) -> DateTime<Utc> {
        self.created_at - Duration::microseconds(1)
    }
}

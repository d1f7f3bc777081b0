//! Outcome of resolving one entity at one instant.

use serde::{Deserialize, Serialize};

use super::{AttributeSet, SnapshotSource};

/// Why an entity did not exist at the requested instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceReason {
    /// No version records and no live row.
    NeverExisted,
    /// The first version after the instant is its Create.
    NotYetCreated,
    /// Destroyed at or before the instant.
    Destroyed,
    /// History ends without a Destroy but the live row is gone.
    Untracked,
}

/// Attributes of an entity that existed at the requested instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub attributes: AttributeSet,
    pub source: SnapshotSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Existed(Snapshot),
    Absent { reason: AbsenceReason },
}

impl Resolution {
    pub fn absent(reason: AbsenceReason) -> Self {
        Self::Absent { reason }
    }

    pub fn existed(&self) -> bool {
        matches!(self, Self::Existed(_))
    }

    pub fn attributes(&self) -> Option<&AttributeSet> {
        match self {
            Self::Existed(snapshot) => Some(&snapshot.attributes),
            Self::Absent { .. } => None,
        }
    }

    pub fn absence_reason(&self) -> Option<AbsenceReason> {
        match self {
            Self::Existed(_) => None,
            Self::Absent { reason } => Some(*reason),
        }
    }
}

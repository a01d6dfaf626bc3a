//! Roster entries as delivered by a participant supplier

use super::{GeoPoint, WeeklySchedule};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque participant identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One participant in the roster.
///
/// Any fields beyond id, schedule and point are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: ParticipantId,
    #[serde(rename = "weeklySchedule", alias = "schedule")]
    pub schedule: WeeklySchedule,
    pub point: GeoPoint,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RosterEntry {
    #[must_use]
    pub fn new(id: impl Into<ParticipantId>, schedule: WeeklySchedule, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            schedule,
            point,
            extra: Map::new(),
        }
    }

    /// Attach a passthrough field
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

// Occupancy counters: the cached snapshot and the partial update body of POST /update.

use serde::{Deserialize, Serialize};

/// Current occupancy counters. `inside` is expected to equal `entered - departed`
/// but is stored as received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entered: u64,
    pub departed: u64,
    pub inside: i64,
}

impl Snapshot {
    pub fn new(entered: u64, departed: u64, inside: i64) -> Self {
        Self {
            entered,
            departed,
            inside,
        }
    }

    /// True when `inside == entered - departed`.
    pub fn is_consistent(&self) -> bool {
        i128::from(self.inside) == i128::from(self.entered) - i128::from(self.departed)
    }
}

/// Any subset of the three counters. A missing field and an explicit `null` both
/// mean "leave unchanged"; unknown fields are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside: Option<i64>,
}

impl SnapshotUpdate {
    /// Update that overwrites all three fields.
    pub fn full(snapshot: Snapshot) -> Self {
        Self {
            entered: Some(snapshot.entered),
            departed: Some(snapshot.departed),
            inside: Some(snapshot.inside),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entered.is_none() && self.departed.is_none() && self.inside.is_none()
    }

    /// Overlay the present fields on `base`.
    pub fn apply_to(&self, base: Snapshot) -> Snapshot {
        Snapshot {
            entered: self.entered.unwrap_or(base.entered),
            departed: self.departed.unwrap_or(base.departed),
            inside: self.inside.unwrap_or(base.inside),
        }
    }

    /// Parse a request body that has already been decoded as JSON.
    /// Only objects are accepted (serde would otherwise take `[1, 2, 3]` as a tuple form).
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "expected a JSON object with entered/departed/inside, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

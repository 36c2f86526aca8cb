// History rows and the chart-friendly projection served by GET /history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Snapshot;

/// strftime pattern for `HistorySeries::labels` (UTC).
pub const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted snapshot. Timestamps have second resolution; records sharing a
/// second co-exist and keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub entered: u64,
    pub departed: u64,
    pub inside: i64,
}

impl HistoryRecord {
    pub fn new(snapshot: &Snapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            entered: snapshot.entered,
            departed: snapshot.departed,
            inside: snapshot.inside,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.entered, self.departed, self.inside)
    }
}

/// Parallel arrays of formatted timestamps and `inside` values, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    /// Set when the history backend could not be read; the series is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistorySeries {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        let (labels, values) = records
            .iter()
            .map(|r| (r.timestamp.format(LABEL_FORMAT).to_string(), r.inside))
            .unzip();
        Self {
            labels,
            values,
            error: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            labels: Vec::new(),
            values: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

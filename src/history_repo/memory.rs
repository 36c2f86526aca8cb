// In-memory history: no durability, used for tests and the `memory` backend.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{HistoryStore, Result, RetentionPolicy};
use crate::models::{HistoryRecord, Snapshot};

pub struct MemoryHistoryStore {
    records: Mutex<VecDeque<HistoryRecord>>,
    retention: RetentionPolicy,
}

impl MemoryHistoryStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            retention,
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, snapshot: &Snapshot, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.lock().await;

        // Sorted by timestamp; equal timestamps go after existing ones.
        let mut pos = records.partition_point(|r| r.timestamp <= at);
        records.insert(pos, HistoryRecord::new(snapshot, at));

        match self.retention {
            RetentionPolicy::MaxRecords(max) => {
                let max = max.max(1) as usize;
                while records.len() > max {
                    let victim = if pos == 0 { 1 } else { 0 };
                    records.remove(victim);
                    if victim < pos {
                        pos -= 1;
                    }
                }
            }
            RetentionPolicy::MaxAge(_) => {
                if let Some(cutoff) = self.retention.cutoff(at) {
                    records.retain(|r| r.timestamp >= cutoff);
                }
            }
        }
        Ok(())
    }

    async fn query_range(&self, limit: u32) -> Result<Vec<HistoryRecord>> {
        let records = self.records.lock().await;
        let skip = records.len().saturating_sub(limit as usize);
        Ok(records.iter().skip(skip).cloned().collect())
    }

    async fn load_latest(&self) -> Result<Option<HistoryRecord>> {
        Ok(self.records.lock().await.back().cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.lock().await.len() as u64)
    }
}

// Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use occupancy_relay::history_repo::{
    HistoryError, HistoryStore, MemoryHistoryStore, RetentionPolicy, SqliteHistoryStore,
};
use occupancy_relay::models::{HistoryRecord, Snapshot};
use occupancy_relay::sync_service::{HistoryLimits, SyncService};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Arbitrary fixed base time (2023-11-14T22:13:20Z).
pub const BASE_TS: i64 = 1_700_000_000;

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub fn memory_service() -> Arc<SyncService> {
    memory_service_with(RetentionPolicy::MaxRecords(500), HistoryLimits::default())
}

pub fn memory_service_with(retention: RetentionPolicy, limits: HistoryLimits) -> Arc<SyncService> {
    Arc::new(SyncService::new(
        Arc::new(MemoryHistoryStore::new(retention)),
        limits,
    ))
}

pub async fn sqlite_store(dir: &TempDir, retention: RetentionPolicy) -> SqliteHistoryStore {
    let path = dir.path().join("history.db");
    let store = SqliteHistoryStore::connect(path.to_str().unwrap(), 2, retention)
        .await
        .unwrap();
    store.init().await.unwrap();
    store
}

/// Append `inside` values one second apart starting at BASE_TS.
pub async fn append_series(store: &dyn HistoryStore, insides: &[i64]) {
    for (i, inside) in insides.iter().enumerate() {
        let snapshot = Snapshot::new(*inside as u64, 0, *inside);
        store
            .append(&snapshot, ts(BASE_TS + i as i64))
            .await
            .unwrap();
    }
}

pub fn insides(records: &[HistoryRecord]) -> Vec<i64> {
    records.iter().map(|r| r.inside).collect()
}

/// Backend that is always down.
pub struct FailingStore;

#[async_trait]
impl HistoryStore for FailingStore {
    async fn append(&self, _: &Snapshot, _: DateTime<Utc>) -> Result<(), HistoryError> {
        Err(HistoryError::Unavailable("store offline".into()))
    }

    async fn query_range(&self, _: u32) -> Result<Vec<HistoryRecord>, HistoryError> {
        Err(HistoryError::Unavailable("store offline".into()))
    }

    async fn load_latest(&self) -> Result<Option<HistoryRecord>, HistoryError> {
        Err(HistoryError::Unavailable("store offline".into()))
    }

    async fn count(&self) -> Result<u64, HistoryError> {
        Err(HistoryError::Unavailable("store offline".into()))
    }
}

/// Memory backend whose first append stalls, so a later update can overtake it.
pub struct SlowFirstAppend {
    inner: MemoryHistoryStore,
    delay: Duration,
    stalled: AtomicBool,
}

impl SlowFirstAppend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryHistoryStore::new(RetentionPolicy::MaxRecords(100)),
            delay,
            stalled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl HistoryStore for SlowFirstAppend {
    async fn append(&self, snapshot: &Snapshot, at: DateTime<Utc>) -> Result<(), HistoryError> {
        if !self.stalled.swap(true, Ordering::AcqRel) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.append(snapshot, at).await
    }

    async fn query_range(&self, limit: u32) -> Result<Vec<HistoryRecord>, HistoryError> {
        self.inner.query_range(limit).await
    }

    async fn load_latest(&self) -> Result<Option<HistoryRecord>, HistoryError> {
        self.inner.load_latest().await
    }

    async fn count(&self) -> Result<u64, HistoryError> {
        self.inner.count().await
    }
}

// Occupancy history. One trait, two backends (in-memory, SQLite); the backend is
// picked from config at startup and shared behind `Arc<dyn HistoryStore>`.

mod memory;
mod sqlite;

pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::config::{HistoryBackend, HistoryConfig};
use crate::models::{HistoryRecord, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("value out of range for storage: {0}")]
    OutOfRange(String),

    #[error("corrupt history row: {0}")]
    Corrupt(String),

    #[error("history backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// How much history survives an append. Evaluated at write time, relative to the
/// timestamp of the record being written; that record is never pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep the N most recent records (N >= 1).
    MaxRecords(u32),
    /// Drop records older than `at - age`.
    MaxAge(TimeDelta),
}

impl RetentionPolicy {
    /// Oldest timestamp kept under `MaxAge`; `None` for count-based retention or
    /// when the subtraction would underflow.
    pub fn cutoff(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RetentionPolicy::MaxRecords(_) => None,
            RetentionPolicy::MaxAge(age) => at.checked_sub_signed(*age),
        }
    }
}

/// Append-only log of counter snapshots.
///
/// Ordering is ascending by timestamp with ties in insertion order. Implementations
/// must be safe to call from concurrent request handlers.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Write one record, then apply the retention policy.
    async fn append(&self, snapshot: &Snapshot, at: DateTime<Utc>) -> Result<()>;

    /// At most `limit` most-recent records, oldest first. Empty store gives an empty vec.
    async fn query_range(&self, limit: u32) -> Result<Vec<HistoryRecord>>;

    /// Most recent record, if any.
    async fn load_latest(&self) -> Result<Option<HistoryRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64>;
}

/// Build the configured backend. SQLite is connected and its schema created.
pub async fn open(config: &HistoryConfig) -> anyhow::Result<Arc<dyn HistoryStore>> {
    let retention = config.retention_policy();
    let store: Arc<dyn HistoryStore> = match config.backend {
        HistoryBackend::Memory => Arc::new(MemoryHistoryStore::new(retention)),
        HistoryBackend::Sqlite => {
            let repo =
                SqliteHistoryStore::connect(&config.path, config.max_pool_size, retention).await?;
            repo.init().await?;
            Arc::new(repo)
        }
    };
    tracing::info!(backend = ?config.backend, retention = ?retention, "history store ready");
    Ok(store)
}

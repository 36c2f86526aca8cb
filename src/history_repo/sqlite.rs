// SQLite history. One row per update; created_at is unix seconds, `id` breaks ties
// between rows written in the same second.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::instrument;

use super::{HistoryError, HistoryStore, Result, RetentionPolicy};
use crate::models::{HistoryRecord, Snapshot};

pub struct SqliteHistoryStore {
    pool: SqlitePool,
    retention: RetentionPolicy,
}

impl SqliteHistoryStore {
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        retention: RetentionPolicy,
    ) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size.max(1))
            .connect_with(opts)
            .await?;
        Ok(Self { pool, retention })
    }

    /// Create the table and index. Safe to call repeatedly.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS occupancy_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                entered INTEGER NOT NULL,
                departed INTEGER NOT NULL,
                inside INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_occupancy_created_at ON occupancy_history(created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn parse_row(row: &SqliteRow) -> Result<HistoryRecord> {
        let created_at: i64 = row.try_get("created_at")?;
        let entered: i64 = row.try_get("entered")?;
        let departed: i64 = row.try_get("departed")?;
        let inside: i64 = row.try_get("inside")?;

        let timestamp = DateTime::<Utc>::from_timestamp(created_at, 0)
            .ok_or_else(|| HistoryError::Corrupt(format!("created_at {created_at}")))?;
        let entered = u64::try_from(entered)
            .map_err(|_| HistoryError::Corrupt(format!("entered {entered}")))?;
        let departed = u64::try_from(departed)
            .map_err(|_| HistoryError::Corrupt(format!("departed {departed}")))?;

        Ok(HistoryRecord {
            timestamp,
            entered,
            departed,
            inside,
        })
    }
}

fn to_column(field: &str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| HistoryError::OutOfRange(format!("{field} = {value}")))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    #[instrument(skip(self, snapshot), fields(repo = "history", operation = "append"))]
    async fn append(&self, snapshot: &Snapshot, at: DateTime<Utc>) -> Result<()> {
        let entered = to_column("entered", snapshot.entered)?;
        let departed = to_column("departed", snapshot.departed)?;

        let mut tx = self.pool.begin().await?;
        let id = sqlx::query(
            "INSERT INTO occupancy_history (created_at, entered, departed, inside) VALUES ($1, $2, $3, $4)",
        )
        .bind(at.timestamp())
        .bind(entered)
        .bind(departed)
        .bind(snapshot.inside)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let pruned = match self.retention {
            // The new row plus the (max - 1) most recent others.
            RetentionPolicy::MaxRecords(max) => sqlx::query(
                "DELETE FROM occupancy_history WHERE id != $1 AND id NOT IN
                 (SELECT id FROM occupancy_history WHERE id != $1
                  ORDER BY created_at DESC, id DESC LIMIT $2)",
            )
            .bind(id)
            .bind(i64::from(max.max(1)) - 1)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
            RetentionPolicy::MaxAge(_) => match self.retention.cutoff(at) {
                Some(cutoff) => {
                    sqlx::query("DELETE FROM occupancy_history WHERE created_at < $1")
                        .bind(cutoff.timestamp())
                        .execute(&mut *tx)
                        .await?
                        .rows_affected()
                }
                None => 0,
            },
        };
        tx.commit().await?;

        if pruned > 0 {
            tracing::debug!(rows_pruned = pruned, "history retention applied");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "history", operation = "query_range"))]
    async fn query_range(&self, limit: u32) -> Result<Vec<HistoryRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT created_at, entered, departed, inside
             FROM occupancy_history ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_row(&row)?);
        }
        out.reverse();
        Ok(out)
    }

    async fn load_latest(&self) -> Result<Option<HistoryRecord>> {
        let row = sqlx::query(
            "SELECT created_at, entered, departed, inside
             FROM occupancy_history ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn count(&self) -> Result<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM occupancy_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }
}

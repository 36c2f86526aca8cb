// Orchestrates the counter cache, the reset command and the history store.
// One instance per process, shared with the HTTP layer through `Arc`.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::history_repo::HistoryStore;
use crate::models::{CommandSignal, HistorySeries, Snapshot, SnapshotUpdate};
use crate::state::{CommandFlag, StateCache};

/// Bounds for GET /history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

impl HistoryLimits {
    /// Requested limit, or the default, clamped to `max_limit`.
    pub fn resolve(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

pub struct SyncService {
    cache: StateCache,
    /// Held across cache apply and history append so both see updates in the same order.
    write_order: Mutex<()>,
    command: CommandFlag,
    history: Arc<dyn HistoryStore>,
    limits: HistoryLimits,
}

impl SyncService {
    pub fn new(history: Arc<dyn HistoryStore>, limits: HistoryLimits) -> Self {
        Self {
            cache: StateCache::new(),
            write_order: Mutex::new(()),
            command: CommandFlag::new(),
            history,
            limits,
        }
    }

    /// Apply a partial update and record the resulting snapshot.
    /// A history write failure is logged; the cached update stands.
    #[instrument(skip(self), fields(operation = "update"))]
    pub async fn update(&self, update: SnapshotUpdate) -> Snapshot {
        let _order = self.write_order.lock().await;
        let snapshot = self.cache.apply_update(&update);
        if !snapshot.is_consistent() {
            tracing::debug!(
                entered = snapshot.entered,
                departed = snapshot.departed,
                inside = snapshot.inside,
                "inside != entered - departed; stored as received"
            );
        }
        if let Err(e) = self.history.append(&snapshot, now_seconds()).await {
            tracing::warn!(
                error = %e,
                operation = "history_append",
                "failed to persist snapshot"
            );
        }
        snapshot
    }

    pub fn status(&self) -> Snapshot {
        self.cache.snapshot()
    }

    /// Most recent `limit` points (default/clamped per [`HistoryLimits`]), oldest first.
    /// A backend failure yields an empty series carrying the error text.
    #[instrument(skip(self), fields(operation = "history"))]
    pub async fn history(&self, limit: Option<u32>) -> HistorySeries {
        let limit = self.limits.resolve(limit);
        match self.history.query_range(limit).await {
            Ok(records) => HistorySeries::from_records(&records),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = "history_query",
                    "failed to read history"
                );
                HistorySeries::unavailable(e.to_string())
            }
        }
    }

    pub fn request_reset(&self) {
        if self.command.request_reset() {
            tracing::info!("reset command queued");
        } else {
            tracing::debug!("reset command already pending");
        }
    }

    /// Read-and-clear the reset flag.
    pub fn poll_command(&self) -> CommandSignal {
        let signal = CommandSignal::from(self.command.poll_and_clear());
        if signal == CommandSignal::Reset {
            tracing::info!("reset command delivered");
        }
        signal
    }

    pub fn reset_pending(&self) -> bool {
        self.command.is_pending()
    }

    /// Seed the cache from the newest history record, if there is one.
    pub async fn restore_from_history(&self) -> anyhow::Result<Option<Snapshot>> {
        let _order = self.write_order.lock().await;
        let Some(latest) = self.history.load_latest().await? else {
            return Ok(None);
        };
        let snapshot = latest.snapshot();
        self.cache.restore(snapshot);
        tracing::info!(
            entered = snapshot.entered,
            departed = snapshot.departed,
            inside = snapshot.inside,
            recorded_at = %latest.timestamp,
            "counters restored from history"
        );
        Ok(Some(snapshot))
    }
}

fn now_seconds() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

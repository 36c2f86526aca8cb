// Process-lifetime state: the counter cache and the one-slot reset command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::models::{Snapshot, SnapshotUpdate};

/// Latest counters. A whole update is applied under one write lock, so readers
/// never see a half-applied snapshot.
#[derive(Debug, Default)]
pub struct StateCache {
    inner: RwLock<Snapshot>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Overwrite the fields present in `update` and return the resulting snapshot.
    pub fn apply_update(&self, update: &SnapshotUpdate) -> Snapshot {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = update.apply_to(*guard);
        *guard
    }

    pub fn snapshot(&self) -> Snapshot {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full replace (startup restore).
    pub fn restore(&self, snapshot: Snapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

/// Edge-triggered reset request with read-and-clear semantics.
///
/// `Idle -> ResetRequested` on [`request_reset`](Self::request_reset);
/// `ResetRequested -> Idle` on the first [`poll_and_clear`](Self::poll_and_clear)
/// that observes it. Both are a single atomic swap, so concurrent pollers consume
/// a given edge at most once.
#[derive(Debug, Default)]
pub struct CommandFlag {
    pending: AtomicBool,
}

impl CommandFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this call raised the flag, false if a reset was already pending.
    pub fn request_reset(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    /// Returns whether a reset was pending, clearing it in the same step.
    pub fn poll_and_clear(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Non-consuming peek.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

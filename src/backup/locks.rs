//! Per-backup-id operation locks.
//!
//! Create, restore, delete, and prune must not interleave on the same
//! `backupId` (e.g. restoring from a backup mid-deletion). Operations on
//! distinct ids may proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Registry handing out one mutex per backup id.
///
/// Shared (via `Arc`) between the backup manager and the rollback manager so
/// both serialize against the same lock for a given id.
#[derive(Debug, Default)]
pub struct BackupLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BackupLockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or create) the lock for `backup_id`.
    ///
    /// Callers hold the returned mutex for the duration of the operation:
    ///
    /// ```rust,no_run
    /// # use sweepsafe::backup::locks::BackupLockRegistry;
    /// # let registry = BackupLockRegistry::new();
    /// let lock = registry.acquire("20260301_120000");
    /// let _guard = lock.lock();
    /// // ... operate on the backup ...
    /// ```
    #[must_use]
    pub fn acquire(&self, backup_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(backup_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry for an id that no longer exists on disk.
    ///
    /// Only removes the entry when no other holder remains; a concurrent
    /// holder keeps its `Arc` and the entry stays.
    pub fn release(&self, backup_id: &str) {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(backup_id)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(backup_id);
        }
    }

    /// Number of ids currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

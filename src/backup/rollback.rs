//! Rollback: listing, inspecting, restoring, deleting, and pruning backups.
//!
//! All reads go through the sidecar manifests; the file-tree is only touched
//! when restoring or deleting. Listings never fail on one bad sidecar: an
//! unreadable manifest is skipped with a warning so the rest of the backups
//! stay reachable.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::backup::locks::BackupLockRegistry;
use crate::backup::manager::{copy_dir_recursive, copy_file};
use crate::backup::manifest::BackupManifest;
use crate::core::errors::{Result, SwsError};
use crate::logger::{AuditEvent, AuditLoggerHandle};

/// One row in a backup listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub backup_id: String,
    pub created_time: DateTime<Utc>,
    pub task_id: String,
    pub total_size: u64,
    pub file_count: usize,
    pub is_valid: bool,
}

/// Full detail for one backup.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub manifest: BackupManifest,
    pub is_valid: bool,
}

/// Outcome of a restore.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl RestoreReport {
    /// A restore counts as successful once anything came back.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.restored >= 1
    }
}

/// Manages the lifecycle of existing backups.
pub struct RollbackManager {
    backup_dir: PathBuf,
    locks: Arc<BackupLockRegistry>,
    audit: Option<AuditLoggerHandle>,
}

impl RollbackManager {
    #[must_use]
    pub fn new(
        backup_dir: PathBuf,
        locks: Arc<BackupLockRegistry>,
        audit: Option<AuditLoggerHandle>,
    ) -> Self {
        Self {
            backup_dir,
            locks,
            audit,
        }
    }

    /// All backups, newest first. Unreadable sidecars are skipped with a
    /// warning, never surfaced as an error.
    #[must_use]
    pub fn list_backups(&self) -> Vec<BackupSummary> {
        let mut summaries = Vec::new();
        for backup_id in self.sidecar_ids() {
            match BackupManifest::load(&self.backup_dir, &backup_id) {
                Ok(manifest) => {
                    let is_valid = manifest.is_valid(&self.backup_dir);
                    summaries.push(BackupSummary {
                        backup_id: manifest.backup_id,
                        created_time: manifest.created_time,
                        task_id: manifest.task_id,
                        total_size: manifest.total_size,
                        file_count: manifest.files.len(),
                        is_valid,
                    });
                }
                Err(err) => self.warn_skipped(&backup_id, &err),
            }
        }
        summaries.sort_by(|a, b| b.created_time.cmp(&a.created_time));
        summaries
    }

    /// Detail for one backup, or `None` when its sidecar cannot be read.
    #[must_use]
    pub fn get_backup_info(&self, backup_id: &str) -> Option<BackupInfo> {
        match BackupManifest::load(&self.backup_dir, backup_id) {
            Ok(manifest) => {
                let is_valid = manifest.is_valid(&self.backup_dir);
                Some(BackupInfo { manifest, is_valid })
            }
            Err(SwsError::BackupMissing { .. }) => None,
            Err(err) => {
                self.warn_skipped(backup_id, &err);
                None
            }
        }
    }

    /// Restore files from a backup to their original locations.
    ///
    /// `selection`, when given, limits the restore to entries whose
    /// `originalPath` appears in it; selectors naming nothing in the manifest
    /// are ignored. Each restored entry replaces whatever currently occupies
    /// its original path. Per-entry failures are reported, not fatal.
    pub fn restore_backup(
        &self,
        backup_id: &str,
        selection: Option<&[PathBuf]>,
    ) -> Result<RestoreReport> {
        let lock = self.locks.acquire(backup_id);
        let result = {
            let _guard = lock.lock();
            self.restore_locked(backup_id, selection)
        };
        drop(lock);
        self.locks.release(backup_id);
        result
    }

    fn restore_locked(
        &self,
        backup_id: &str,
        selection: Option<&[PathBuf]>,
    ) -> Result<RestoreReport> {
        let manifest = BackupManifest::load(&self.backup_dir, backup_id)?;
        if !manifest.is_valid(&self.backup_dir) {
            return Err(SwsError::BackupInvalid {
                backup_id: backup_id.to_string(),
            });
        }

        let tree = BackupManifest::tree_path(&self.backup_dir, backup_id);
        let mut report = RestoreReport::default();

        for entry in &manifest.files {
            if let Some(wanted) = selection
                && !wanted.iter().any(|p| p == &entry.original_path)
            {
                continue;
            }

            let source = tree.join(&entry.relative_path);
            match restore_entry(&source, &entry.original_path, entry.is_directory) {
                Ok(()) => report.restored += 1,
                Err(err) => {
                    report.failed += 1;
                    report.errors.push(err.to_string());
                    if let Some(audit) = &self.audit {
                        audit.log(AuditEvent::RestoreEntryFailed {
                            backup_id: backup_id.to_string(),
                            path: entry.original_path.display().to_string(),
                            error_message: err.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(audit) = &self.audit {
            audit.log(AuditEvent::BackupRestored {
                backup_id: backup_id.to_string(),
                restored: report.restored as u64,
                failed: report.failed as u64,
            });
        }
        Ok(report)
    }

    /// Delete a backup's file-tree and sidecar. Returns `Ok(false)` when no
    /// trace of the backup exists.
    pub fn delete_backup(&self, backup_id: &str) -> Result<bool> {
        let lock = self.locks.acquire(backup_id);
        let result = {
            let _guard = lock.lock();
            self.delete_locked(backup_id)
        };
        drop(lock);
        self.locks.release(backup_id);
        let removed = result?;

        if removed && let Some(audit) = &self.audit {
            audit.log(AuditEvent::BackupDeleted {
                backup_id: backup_id.to_string(),
            });
        }
        Ok(removed)
    }

    fn delete_locked(&self, backup_id: &str) -> Result<bool> {
        let tree = BackupManifest::tree_path(&self.backup_dir, backup_id);
        let tree_removed = match fs::remove_dir_all(&tree) {
            Ok(()) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(source) => return Err(SwsError::io(tree, source)),
        };
        let sidecar_removed = BackupManifest::remove_sidecar(&self.backup_dir, backup_id)?;
        Ok(tree_removed || sidecar_removed)
    }

    /// Remove backups older than `days` days. Zero days disables pruning.
    /// Returns how many backups were removed.
    #[must_use]
    pub fn prune_older_than(&self, days: u32) -> usize {
        if days == 0 {
            return 0;
        }
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let mut removed = 0usize;

        for backup_id in self.sidecar_ids() {
            match BackupManifest::load(&self.backup_dir, &backup_id) {
                Ok(manifest) if manifest.created_time < cutoff => {
                    match self.delete_backup(&backup_id) {
                        Ok(true) => removed += 1,
                        Ok(false) => {}
                        Err(err) => self.warn_skipped(&backup_id, &err),
                    }
                }
                Ok(_) => {}
                Err(err) => self.warn_skipped(&backup_id, &err),
            }
        }

        if let Some(audit) = &self.audit {
            audit.log(AuditEvent::BackupPruned {
                removed: removed as u64,
                days: u64::from(days),
            });
        }
        removed
    }

    /// Backup ids derived from `*.json` sidecar names, unsorted.
    fn sidecar_ids(&self) -> Vec<String> {
        let Ok(reader) = fs::read_dir(&self.backup_dir) else {
            return Vec::new();
        };
        let mut ids = Vec::new();
        for entry in reader.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                ids.push(stem.to_string());
            }
        }
        ids
    }

    fn warn_skipped(&self, backup_id: &str, err: &SwsError) {
        eprintln!("[SWS-ROLLBACK] WARNING: skipping backup {backup_id}: {err}");
        if let Some(audit) = &self.audit {
            audit.log(AuditEvent::ManifestSkipped {
                path: BackupManifest::sidecar_path(&self.backup_dir, backup_id)
                    .display()
                    .to_string(),
                details: err.to_string(),
            });
        }
    }
}

/// Put one backed-up entry back at its original path, replacing whatever is
/// there now.
fn restore_entry(source: &Path, original: &Path, is_directory: bool) -> Result<()> {
    if !source.exists() {
        return Err(SwsError::copy(
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "backup copy missing"),
        ));
    }

    if original.is_dir() {
        fs::remove_dir_all(original).map_err(|err| SwsError::io(original, err))?;
    } else if original.exists() {
        fs::remove_file(original).map_err(|err| SwsError::io(original, err))?;
    }

    if is_directory {
        copy_dir_recursive(source, original)
    } else {
        copy_file(source, original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::manager::BackupManager;
    use crate::model::FileItem;

    struct Fixture {
        _work: tempfile::TempDir,
        backups: tempfile::TempDir,
        locks: Arc<BackupLockRegistry>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                _work: tempfile::tempdir().unwrap(),
                backups: tempfile::tempdir().unwrap(),
                locks: Arc::new(BackupLockRegistry::new()),
            }
        }

        fn manager(&self) -> BackupManager {
            BackupManager::new(
                self.backups.path().to_path_buf(),
                Arc::clone(&self.locks),
                None,
            )
        }

        fn rollback(&self) -> RollbackManager {
            RollbackManager::new(
                self.backups.path().to_path_buf(),
                Arc::clone(&self.locks),
                None,
            )
        }

        fn item(&self, name: &str, contents: &str) -> FileItem {
            let path = self._work.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, contents).unwrap();
            FileItem::from_path(&path).unwrap()
        }
    }

    #[test]
    fn restore_brings_deleted_files_back() {
        let fx = Fixture::new();
        let a = fx.item("a.tmp", "alpha");
        let b = fx.item("nested/b.log", "beta");
        let receipt = fx.manager().create_backup("t1", &[a.clone(), b.clone()]).unwrap();

        fs::remove_file(&a.path).unwrap();
        fs::remove_file(&b.path).unwrap();

        let report = fx
            .rollback()
            .restore_backup(&receipt.manifest.backup_id, None)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.restored, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(fs::read_to_string(&a.path).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(&b.path).unwrap(), "beta");
    }

    #[test]
    fn restore_replaces_whatever_now_occupies_the_path() {
        let fx = Fixture::new();
        let a = fx.item("a.tmp", "original");
        let receipt = fx.manager().create_backup("t1", &[a.clone()]).unwrap();

        fs::write(&a.path, "overwritten since").unwrap();

        let report = fx
            .rollback()
            .restore_backup(&receipt.manifest.backup_id, None)
            .unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(fs::read_to_string(&a.path).unwrap(), "original");
    }

    #[test]
    fn selective_restore_ignores_unknown_selectors() {
        let fx = Fixture::new();
        let a = fx.item("a.tmp", "alpha");
        let b = fx.item("b.tmp", "beta");
        let receipt = fx.manager().create_backup("t1", &[a.clone(), b.clone()]).unwrap();
        fs::remove_file(&a.path).unwrap();
        fs::remove_file(&b.path).unwrap();

        let selection = vec![a.path.clone(), PathBuf::from("/no/such/entry")];
        let report = fx
            .rollback()
            .restore_backup(&receipt.manifest.backup_id, Some(&selection))
            .unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(report.failed, 0);
        assert!(a.path.exists());
        assert!(!b.path.exists());
    }

    #[test]
    fn restore_of_missing_backup_is_an_error() {
        let fx = Fixture::new();
        let err = fx.rollback().restore_backup("nope", None).unwrap_err();
        assert_eq!(err.code(), "SWS-2004");
    }

    #[test]
    fn restore_of_invalid_backup_is_an_error() {
        let fx = Fixture::new();
        let a = fx.item("a.tmp", "x");
        let receipt = fx.manager().create_backup("t1", &[a]).unwrap();
        fs::remove_dir_all(BackupManifest::tree_path(
            fx.backups.path(),
            &receipt.manifest.backup_id,
        ))
        .unwrap();

        let err = fx
            .rollback()
            .restore_backup(&receipt.manifest.backup_id, None)
            .unwrap_err();
        assert_eq!(err.code(), "SWS-2003");
    }

    #[test]
    fn listings_are_newest_first_and_skip_bad_sidecars() {
        let fx = Fixture::new();
        let older = BackupManifest {
            backup_id: "20260101_000000".to_string(),
            created_time: Utc::now() - Duration::days(10),
            task_id: "old".to_string(),
            total_size: 1,
            files: Vec::new(),
        };
        let newer = BackupManifest {
            backup_id: "20260801_000000".to_string(),
            created_time: Utc::now(),
            task_id: "new".to_string(),
            total_size: 2,
            files: Vec::new(),
        };
        older.store(fx.backups.path()).unwrap();
        newer.store(fx.backups.path()).unwrap();
        fs::write(fx.backups.path().join("corrupt.json"), "{ nope").unwrap();

        let listing = fx.rollback().list_backups();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].backup_id, "20260801_000000");
        assert_eq!(listing[1].backup_id, "20260101_000000");
        assert!(!listing[0].is_valid);
    }

    #[test]
    fn info_reports_validity() {
        let fx = Fixture::new();
        let a = fx.item("a.tmp", "x");
        let receipt = fx.manager().create_backup("t1", &[a]).unwrap();
        let id = receipt.manifest.backup_id.clone();

        let info = fx.rollback().get_backup_info(&id).unwrap();
        assert!(info.is_valid);
        assert_eq!(info.manifest.task_id, "t1");

        fs::remove_dir_all(BackupManifest::tree_path(fx.backups.path(), &id)).unwrap();
        assert!(!fx.rollback().get_backup_info(&id).unwrap().is_valid);
        assert!(fx.rollback().get_backup_info("absent").is_none());
    }

    #[test]
    fn delete_removes_tree_and_sidecar() {
        let fx = Fixture::new();
        let a = fx.item("a.tmp", "x");
        let receipt = fx.manager().create_backup("t1", &[a]).unwrap();
        let id = receipt.manifest.backup_id.clone();

        assert!(fx.rollback().delete_backup(&id).unwrap());
        assert!(!BackupManifest::sidecar_path(fx.backups.path(), &id).exists());
        assert!(!BackupManifest::tree_path(fx.backups.path(), &id).exists());

        // Absent backup reports false, not an error.
        assert!(!fx.rollback().delete_backup(&id).unwrap());
    }

    #[test]
    fn lock_registry_is_emptied_after_each_operation() {
        let fx = Fixture::new();
        let a = fx.item("a.tmp", "alpha");
        let receipt = fx.manager().create_backup("t1", &[a.clone()]).unwrap();
        let id = receipt.manifest.backup_id.clone();
        assert!(fx.locks.is_empty());

        fs::remove_file(&a.path).unwrap();
        fx.rollback().restore_backup(&id, None).unwrap();
        assert!(fx.locks.is_empty());

        // Failed operations release their entry too.
        assert!(fx.rollback().restore_backup("absent", None).is_err());
        assert!(fx.locks.is_empty());

        fx.rollback().delete_backup(&id).unwrap();
        assert!(fx.locks.is_empty());
    }

    #[test]
    fn prune_honors_retention_and_zero_disables() {
        let fx = Fixture::new();
        let old = BackupManifest {
            backup_id: "old".to_string(),
            created_time: Utc::now() - Duration::days(45),
            task_id: "t".to_string(),
            total_size: 0,
            files: Vec::new(),
        };
        let fresh = BackupManifest {
            backup_id: "fresh".to_string(),
            created_time: Utc::now() - Duration::days(2),
            task_id: "t".to_string(),
            total_size: 0,
            files: Vec::new(),
        };
        old.store(fx.backups.path()).unwrap();
        fresh.store(fx.backups.path()).unwrap();

        assert_eq!(fx.rollback().prune_older_than(0), 0);
        assert_eq!(fx.rollback().prune_older_than(30), 1);
        assert!(
            !BackupManifest::sidecar_path(fx.backups.path(), "old").exists()
        );
        assert!(
            BackupManifest::sidecar_path(fx.backups.path(), "fresh").exists()
        );
    }
}

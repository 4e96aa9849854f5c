//! Backup creation.
//!
//! A backup copies the files a clean task is about to delete into
//! `<backup_dir>/<backupId>/`, preserving directory structure relative to the
//! deepest common root of the batch, and records a sidecar manifest next to
//! it. Creation is best-effort per entry: a file that cannot be copied is
//! reported and omitted, it does not abort the batch.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::backup::locks::BackupLockRegistry;
use crate::backup::manifest::{BackupEntry, BackupManifest};
use crate::core::errors::{Result, SwsError};
use crate::logger::{AuditEvent, AuditLoggerHandle};
use crate::model::FileItem;

/// Outcome of a single entry that could not be backed up.
#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub path: PathBuf,
    pub code: &'static str,
    pub message: String,
}

/// Whether every requested entry made it into the backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    Complete,
    /// At least one entry failed; the manifest covers the successes only.
    Degraded,
}

/// Result of [`BackupManager::create_backup`].
#[derive(Debug)]
pub struct BackupReceipt {
    pub manifest: BackupManifest,
    /// Entries requested, including failures.
    pub requested: usize,
    pub failed: Vec<EntryFailure>,
    pub status: BackupStatus,
}

impl BackupReceipt {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.manifest.file_count()
    }
}

/// Creates backups under a configured base directory.
pub struct BackupManager {
    backup_dir: PathBuf,
    locks: Arc<BackupLockRegistry>,
    audit: Option<AuditLoggerHandle>,
}

impl BackupManager {
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

    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Back up `items` before a clean task deletes them.
    ///
    /// Copies run under the new backup id's lock. Per-entry copy failures are
    /// audit-logged and reported in the receipt; the sidecar manifest lists
    /// successes only and `totalSize` sums only those. The sidecar is on disk
    /// before this returns.
    pub fn create_backup(&self, task_id: &str, items: &[FileItem]) -> Result<BackupReceipt> {
        fs::create_dir_all(&self.backup_dir)
            .map_err(|source| SwsError::io(&self.backup_dir, source))?;

        let (backup_id, tree) = self.allocate_backup()?;
        let lock = self.locks.acquire(&backup_id);
        let result = {
            let _guard = lock.lock();
            self.copy_batch(&backup_id, &tree, task_id, items)
        };
        drop(lock);
        self.locks.release(&backup_id);
        result
    }

    fn copy_batch(
        &self,
        backup_id: &str,
        tree: &Path,
        task_id: &str,
        items: &[FileItem],
    ) -> Result<BackupReceipt> {
        let root = common_root(items.iter().map(|item| item.path.as_path()));
        let mut entries = Vec::with_capacity(items.len());
        let mut failed = Vec::new();
        let mut taken: HashSet<PathBuf> = HashSet::new();
        let mut total_size = 0u64;

        for item in items {
            let relative = unique_relative(
                relative_for(&item.path, root.as_deref()),
                &mut taken,
            );
            let dest = tree.join(&relative);
            let is_directory = item.path.is_dir();

            let copied = if is_directory {
                copy_dir_recursive(&item.path, &dest)
            } else {
                copy_file(&item.path, &dest)
            };

            match copied {
                Ok(()) => {
                    total_size += item.size;
                    entries.push(BackupEntry {
                        original_path: item.path.clone(),
                        relative_path: relative,
                        is_directory,
                        size: item.size,
                    });
                }
                Err(err) => {
                    if let Some(audit) = &self.audit {
                        audit.log(AuditEvent::BackupEntryFailed {
                            backup_id: backup_id.to_string(),
                            path: item.path.display().to_string(),
                            error_code: err.code().to_string(),
                            error_message: err.to_string(),
                        });
                    }
                    failed.push(EntryFailure {
                        path: item.path.clone(),
                        code: err.code(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let manifest = BackupManifest {
            backup_id: backup_id.to_string(),
            created_time: Utc::now(),
            task_id: task_id.to_string(),
            total_size,
            files: entries,
        };
        manifest.store(&self.backup_dir)?;

        if let Some(audit) = &self.audit {
            audit.log(AuditEvent::BackupCreated {
                backup_id: backup_id.to_string(),
                task_id: task_id.to_string(),
                file_count: manifest.file_count() as u64,
                total_size,
            });
        }

        let status = if failed.is_empty() {
            BackupStatus::Complete
        } else {
            BackupStatus::Degraded
        };
        Ok(BackupReceipt {
            manifest,
            requested: items.len(),
            failed,
            status,
        })
    }

    /// Reserve a fresh time-derived id, with a numeric suffix when a
    /// same-second backup (or leftover tree) already holds the base name.
    ///
    /// Creating the tree directory IS the reservation: `fs::create_dir` is
    /// atomic, so two concurrent callers probing the same candidate get one
    /// `Ok` and one `AlreadyExists`. A sidecar without a tree (a manually
    /// gutted backup) also blocks its id, via the sidecar check.
    fn allocate_backup(&self) -> Result<(String, PathBuf)> {
        let base = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut suffix = 0u32;
        loop {
            let candidate = if suffix == 0 {
                base.clone()
            } else {
                format!("{base}_{suffix}")
            };
            suffix += 1;
            if BackupManifest::sidecar_path(&self.backup_dir, &candidate).exists() {
                continue;
            }
            let tree = BackupManifest::tree_path(&self.backup_dir, &candidate);
            match fs::create_dir(&tree) {
                Ok(()) => return Ok((candidate, tree)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => return Err(SwsError::io(&tree, source)),
            }
        }
    }
}

/// Deepest directory containing every path's parent, if any.
fn common_root<'a>(paths: impl Iterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut root: Option<PathBuf> = None;
    for path in paths {
        let parent = path.parent()?;
        root = Some(match root {
            None => parent.to_path_buf(),
            Some(current) => shared_prefix(&current, parent),
        });
    }
    root.filter(|r| !r.as_os_str().is_empty())
}

fn shared_prefix(a: &Path, b: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    for (ca, cb) in a.components().zip(b.components()) {
        if ca != cb {
            break;
        }
        match ca {
            Component::Prefix(p) => prefix.push(p.as_os_str()),
            Component::RootDir => prefix.push(Component::RootDir.as_os_str()),
            other => prefix.push(other.as_os_str()),
        }
    }
    prefix
}

/// Path of the entry inside the backup tree. Falls back to the bare file
/// name when the entry does not sit under the batch root (cross-anchor
/// paths on Windows, or a rootless batch).
fn relative_for(path: &Path, root: Option<&Path>) -> PathBuf {
    if let Some(root) = root
        && let Ok(rel) = path.strip_prefix(root)
        && !rel.as_os_str().is_empty()
    {
        return rel.to_path_buf();
    }
    path.file_name()
        .map_or_else(|| PathBuf::from("unnamed"), PathBuf::from)
}

fn unique_relative(candidate: PathBuf, taken: &mut HashSet<PathBuf>) -> PathBuf {
    if taken.insert(candidate.clone()) {
        return candidate;
    }
    let mut suffix = 1u32;
    loop {
        let mut renamed = candidate.as_os_str().to_owned();
        renamed.push(format!(".{suffix}"));
        let renamed = PathBuf::from(renamed);
        if taken.insert(renamed.clone()) {
            return renamed;
        }
        suffix += 1;
    }
}

pub(crate) fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| SwsError::copy(src, source))?;
    }
    fs::copy(src, dest).map_err(|source| SwsError::copy(src, source))?;
    Ok(())
}

pub(crate) fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|source| SwsError::copy(src, source))?;
    let reader = fs::read_dir(src).map_err(|source| SwsError::copy(src, source))?;
    for entry in reader {
        let entry = entry.map_err(|source| SwsError::copy(src, source))?;
        let child_src = entry.path();
        let child_dest = dest.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|source| SwsError::copy(&child_src, source))?;
        if file_type.is_dir() {
            copy_dir_recursive(&child_src, &child_dest)?;
        } else {
            fs::copy(&child_src, &child_dest)
                .map_err(|source| SwsError::copy(&child_src, source))?;
        }
    }
    Ok(())
}

//! Backup manifest: the persisted sidecar record describing one backup.
//!
//! On disk a backup is two things: `<backup_dir>/<backupId>.json` (this
//! manifest, pretty-printed JSON with camelCase field names) and
//! `<backup_dir>/<backupId>/` (the file-tree holding structural copies at
//! each entry's `relativePath`). A backup is *valid* iff the sidecar parses
//! AND the file-tree directory exists.
//!
//! The sidecar is written to a scratch name and renamed into place, so a
//! manifest is either fully absent or fully present even when the copy that
//! produced it was partial.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SwsError};

/// One backed-up entry: a single file or a whole directory subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub original_path: PathBuf,
    pub relative_path: PathBuf,
    pub is_directory: bool,
    pub size: u64,
}

/// Persisted description of one backup's contents and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub backup_id: String,
    pub created_time: DateTime<Utc>,
    pub task_id: String,
    /// Sum of entry sizes — successfully backed-up entries only.
    pub total_size: u64,
    /// Entry order matches restore precedence (first entries restored first).
    pub files: Vec<BackupEntry>,
}

impl BackupManifest {
    /// Sidecar path for a backup id under `backup_dir`.
    #[must_use]
    pub fn sidecar_path(backup_dir: &Path, backup_id: &str) -> PathBuf {
        backup_dir.join(format!("{backup_id}.json"))
    }

    /// File-tree root for a backup id under `backup_dir`.
    #[must_use]
    pub fn tree_path(backup_dir: &Path, backup_id: &str) -> PathBuf {
        backup_dir.join(backup_id)
    }

    /// Number of entries in the manifest.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Live validity check: sidecar was parseable (we exist) and the paired
    /// file-tree directory still exists.
    #[must_use]
    pub fn is_valid(&self, backup_dir: &Path) -> bool {
        Self::tree_path(backup_dir, &self.backup_id).is_dir()
    }

    /// Persist the sidecar record. Write-then-rename so a crash cannot leave
    /// a half-written manifest behind.
    pub fn store(&self, backup_dir: &Path) -> Result<()> {
        let sidecar = Self::sidecar_path(backup_dir, &self.backup_id);
        let scratch = sidecar.with_extension("json.partial");
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&scratch, raw).map_err(|source| SwsError::io(&scratch, source))?;
        fs::rename(&scratch, &sidecar).map_err(|source| SwsError::io(&sidecar, source))
    }

    /// Load a sidecar record.
    ///
    /// A missing sidecar is `BackupMissing`; an existing but corrupt or
    /// unreadable sidecar is `ManifestUnreadable`.
    pub fn load(backup_dir: &Path, backup_id: &str) -> Result<Self> {
        let sidecar = Self::sidecar_path(backup_dir, backup_id);
        if !sidecar.exists() {
            return Err(SwsError::BackupMissing {
                backup_id: backup_id.to_string(),
            });
        }
        let raw = fs::read_to_string(&sidecar).map_err(|source| SwsError::ManifestUnreadable {
            path: sidecar.clone(),
            details: source.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| SwsError::ManifestUnreadable {
            path: sidecar,
            details: err.to_string(),
        })
    }

    /// Remove the sidecar record from disk. Returns whether it existed.
    pub fn remove_sidecar(backup_dir: &Path, backup_id: &str) -> Result<bool> {
        let sidecar = Self::sidecar_path(backup_dir, backup_id);
        match fs::remove_file(&sidecar) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SwsError::io(sidecar, source)),
        }
    }
}

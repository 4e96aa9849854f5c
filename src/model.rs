//! Shared data model: scan-produced file items, clean categories, verdicts.
//!
//! `FileItem` values are produced by the external scanner and are read-only to
//! this crate. They live for the duration of one scan; nothing here persists.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SwsError};

/// A candidate file reported by the external scanner.
///
/// `path` is absolute and unique within a scan. `content_hash` is optional;
/// the duplicate resolver computes one lazily when it is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub path: PathBuf,
    pub size: u64,
    pub modified_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FileItem {
    /// Build a `FileItem` from live filesystem metadata.
    ///
    /// Convenience for the scanner boundary and for tests; the engine itself
    /// never touches the filesystem to evaluate an item.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|source| SwsError::io(path, source))?;
        let modified = meta
            .modified()
            .map_err(|source| SwsError::io(path, source))?;
        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
            modified_time: DateTime::<Utc>::from(modified),
            content_hash: None,
        })
    }
}

/// Closed set of clean categories a rule can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanCategory {
    TempFiles,
    LogFiles,
    SystemCache,
    DownloadTemp,
    DevelopmentCache,
    LargeFiles,
    DuplicateFiles,
    Other,
}

impl CleanCategory {
    /// Stable label used in audit records and CLI output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TempFiles => "temp_files",
            Self::LogFiles => "log_files",
            Self::SystemCache => "system_cache",
            Self::DownloadTemp => "download_temp",
            Self::DevelopmentCache => "development_cache",
            Self::LargeFiles => "large_files",
            Self::DuplicateFiles => "duplicate_files",
            Self::Other => "other",
        }
    }
}

/// Application-layer deletability verdict for one file.
///
/// `Safe` is the only verdict that authorizes deletion; `Confirm` means no
/// rule made a determination, and `Forbid` is a hard veto (protected path,
/// excluded path, or scan-only category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Confirm,
    Forbid,
}

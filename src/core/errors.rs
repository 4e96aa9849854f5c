//! SWS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SwsError>;

/// Top-level error type for SweepSafe.
#[derive(Debug, Error)]
pub enum SwsError {
    #[error("[SWS-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SWS-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SWS-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SWS-1101] invalid rule pattern {pattern:?}: {details}")]
    InvalidPattern { pattern: String, details: String },

    #[error("[SWS-2001] copy failure for {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SWS-2002] unreadable backup manifest {path}: {details}")]
    ManifestUnreadable { path: PathBuf, details: String },

    #[error("[SWS-2003] backup {backup_id} is invalid (file tree missing)")]
    BackupInvalid { backup_id: String },

    #[error("[SWS-2004] backup {backup_id} does not exist")]
    BackupMissing { backup_id: String },

    #[error("[SWS-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SWS-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SWS-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[SWS-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SwsError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SWS-1001",
            Self::MissingConfig { .. } => "SWS-1002",
            Self::ConfigParse { .. } => "SWS-1003",
            Self::InvalidPattern { .. } => "SWS-1101",
            Self::Copy { .. } => "SWS-2001",
            Self::ManifestUnreadable { .. } => "SWS-2002",
            Self::BackupInvalid { .. } => "SWS-2003",
            Self::BackupMissing { .. } => "SWS-2004",
            Self::Serialization { .. } => "SWS-2101",
            Self::Io { .. } => "SWS-3001",
            Self::ChannelClosed { .. } => "SWS-3002",
            Self::Runtime { .. } => "SWS-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Copy { .. } | Self::Io { .. } | Self::ChannelClosed { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for per-entry copy failures.
    #[must_use]
    pub fn copy(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Copy {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SwsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SwsError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use sweepsafe::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SwsError};

// Model
pub use crate::model::{CleanCategory, FileItem, Verdict};

// Rules
pub use crate::rules::duplicates::{DuplicateResolver, DuplicateSet, KeepStrategy};
pub use crate::rules::engine::{Evaluation, RuleEngine};
pub use crate::rules::rule::{Rule, RuleSpec};

// Backup
pub use crate::backup::locks::BackupLockRegistry;
pub use crate::backup::manager::{BackupManager, BackupReceipt, BackupStatus};
pub use crate::backup::manifest::{BackupEntry, BackupManifest};
pub use crate::backup::rollback::{BackupInfo, BackupSummary, RestoreReport, RollbackManager};

// Logger
pub use crate::logger::{AuditEvent, AuditLoggerHandle, spawn_audit_logger};

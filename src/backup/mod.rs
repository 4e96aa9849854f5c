//! Backup and rollback: structural copies of files about to be deleted,
//! sidecar manifests describing them, and the machinery to restore, delete,
//! and prune them.

pub mod locks;
pub mod manager;
pub mod manifest;
pub mod rollback;

pub use locks::BackupLockRegistry;
pub use manager::{BackupManager, BackupReceipt, BackupStatus, EntryFailure};
pub use manifest::{BackupEntry, BackupManifest};
pub use rollback::{BackupInfo, BackupSummary, RestoreReport, RollbackManager};

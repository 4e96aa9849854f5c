//! Background audit logger.
//!
//! Backup and restore paths never block on the audit log: events go through a
//! bounded crossbeam channel to a dedicated writer thread. When the channel is
//! full the event is counted as dropped and the operation continues.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};

use super::jsonl::{AuditLogConfig, AuditLogWriter, AuditRecord, EventKind, Severity};

const CHANNEL_CAPACITY: usize = 1024;

/// Structured audit events emitted by the backup and rollback managers.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    BackupCreated {
        backup_id: String,
        task_id: String,
        file_count: u64,
        total_size: u64,
    },
    BackupEntryFailed {
        backup_id: String,
        path: String,
        error_code: String,
        error_message: String,
    },
    BackupRestored {
        backup_id: String,
        restored: u64,
        failed: u64,
    },
    RestoreEntryFailed {
        backup_id: String,
        path: String,
        error_message: String,
    },
    BackupDeleted {
        backup_id: String,
    },
    BackupPruned {
        removed: u64,
        days: u64,
    },
    ManifestSkipped {
        path: String,
        details: String,
    },
    Error {
        error_code: String,
        error_message: String,
    },
    Shutdown,
}

impl AuditEvent {
    fn into_record(self) -> Option<AuditRecord> {
        match self {
            Self::BackupCreated {
                backup_id,
                task_id,
                file_count,
                total_size,
            } => {
                let mut r = AuditRecord::new(EventKind::BackupCreated, Severity::Info);
                r.backup_id = Some(backup_id);
                r.task_id = Some(task_id);
                r.count = Some(file_count);
                r.size = Some(total_size);
                Some(r)
            }
            Self::BackupEntryFailed {
                backup_id,
                path,
                error_code,
                error_message,
            } => {
                let mut r = AuditRecord::new(EventKind::BackupEntryFailed, Severity::Warning);
                r.backup_id = Some(backup_id);
                r.path = Some(path);
                r.error_code = Some(error_code);
                r.error_message = Some(error_message);
                Some(r)
            }
            Self::BackupRestored {
                backup_id,
                restored,
                failed,
            } => {
                let mut r = AuditRecord::new(EventKind::BackupRestored, Severity::Info);
                r.backup_id = Some(backup_id);
                r.count = Some(restored);
                r.details = Some(format!("{failed} entries failed"));
                Some(r)
            }
            Self::RestoreEntryFailed {
                backup_id,
                path,
                error_message,
            } => {
                let mut r = AuditRecord::new(EventKind::RestoreEntryFailed, Severity::Warning);
                r.backup_id = Some(backup_id);
                r.path = Some(path);
                r.error_message = Some(error_message);
                Some(r)
            }
            Self::BackupDeleted { backup_id } => {
                let mut r = AuditRecord::new(EventKind::BackupDeleted, Severity::Info);
                r.backup_id = Some(backup_id);
                Some(r)
            }
            Self::BackupPruned { removed, days } => {
                let mut r = AuditRecord::new(EventKind::BackupPruned, Severity::Info);
                r.count = Some(removed);
                r.details = Some(format!("older than {days} days"));
                Some(r)
            }
            Self::ManifestSkipped { path, details } => {
                let mut r = AuditRecord::new(EventKind::ManifestSkipped, Severity::Warning);
                r.path = Some(path);
                r.details = Some(details);
                Some(r)
            }
            Self::Error {
                error_code,
                error_message,
            } => {
                let mut r = AuditRecord::new(EventKind::Error, Severity::Critical);
                r.error_code = Some(error_code);
                r.error_message = Some(error_message);
                Some(r)
            }
            Self::Shutdown => None,
        }
    }
}

/// Cloneable sender side of the audit logger.
#[derive(Debug, Clone)]
pub struct AuditLoggerHandle {
    tx: Sender<AuditEvent>,
    dropped: Arc<AtomicU64>,
}

impl AuditLoggerHandle {
    /// Enqueue an event without blocking. A full channel drops the event and
    /// bumps the dropped counter.
    pub fn log(&self, event: AuditEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events lost to back-pressure or a closed channel so far.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Ask the writer thread to flush and exit. Join the handle returned by
    /// [`spawn_audit_logger`] afterwards to wait for the flush.
    pub fn shutdown(&self) {
        let _ = self.tx.send(AuditEvent::Shutdown);
    }
}

/// Start the writer thread; returns the handle and the join handle.
#[must_use]
pub fn spawn_audit_logger(config: AuditLogConfig) -> (AuditLoggerHandle, thread::JoinHandle<()>) {
    let (tx, rx) = bounded(CHANNEL_CAPACITY);
    let handle = AuditLoggerHandle {
        tx,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    let join = thread::spawn(move || writer_loop(&rx, config));
    (handle, join)
}

fn writer_loop(rx: &Receiver<AuditEvent>, config: AuditLogConfig) {
    let mut writer = AuditLogWriter::open(config);
    while let Ok(event) = rx.recv() {
        let stop = matches!(event, AuditEvent::Shutdown);
        if let Some(record) = event.into_record() {
            writer.write_record(&record);
        }
        if stop {
            break;
        }
    }
    writer.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn events_reach_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let (handle, join) = spawn_audit_logger(AuditLogConfig {
            path: path.clone(),
            ..AuditLogConfig::default()
        });

        handle.log(AuditEvent::BackupCreated {
            backup_id: "20260301_120000".to_string(),
            task_id: "t1".to_string(),
            file_count: 2,
            total_size: 4096,
        });
        handle.log(AuditEvent::BackupDeleted {
            backup_id: "20260301_120000".to_string(),
        });
        handle.shutdown();
        join.join().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("backup_created"));
        assert!(lines[1].contains("backup_deleted"));
    }

    #[test]
    fn shutdown_is_not_written_as_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let (handle, join) = spawn_audit_logger(AuditLogConfig {
            path: path.clone(),
            ..AuditLogConfig::default()
        });
        handle.shutdown();
        join.join().unwrap();

        let contents = fs::read_to_string(&path).unwrap_or_default();
        assert!(contents.is_empty());
    }

    #[test]
    fn full_channel_counts_drops_instead_of_blocking() {
        let (tx, _rx) = bounded(1);
        let handle = AuditLoggerHandle {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        handle.log(AuditEvent::BackupDeleted {
            backup_id: "a".to_string(),
        });
        handle.log(AuditEvent::BackupDeleted {
            backup_id: "b".to_string(),
        });
        assert_eq!(handle.dropped_events(), 1);
    }
}

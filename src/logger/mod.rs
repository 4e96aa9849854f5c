//! Audit logging: JSONL records, written off the hot path.

pub mod audit;
pub mod jsonl;

pub use audit::{AuditEvent, AuditLoggerHandle, spawn_audit_logger};
pub use jsonl::{AuditLogConfig, AuditLogWriter, AuditRecord, EventKind, Severity};

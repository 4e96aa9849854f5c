//! Integration tests: CLI smoke tests and full backup/restore scenarios
//! driven through the public library API plus the `sws` binary.

mod common;

use std::fs;
use std::sync::Arc;

use serde_json::Value;
use sweepsafe::backup::locks::BackupLockRegistry;
use sweepsafe::backup::manager::{BackupManager, BackupStatus};
use sweepsafe::model::FileItem;

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: sws [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("sws") || result.stderr.contains("sws"),
        "missing version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn subcommand_help_flags_work() {
    for sub in ["backups", "show", "restore", "delete", "prune", "classify"] {
        let result =
            common::run_cli_case(&format!("subcommand_help_{sub}"), &[sub, "--help"]);
        assert!(
            result.status.success(),
            "help for {sub} failed; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn backups_listing_reflects_library_created_backups() {
    let work = tempfile::tempdir().unwrap();
    let backups = tempfile::tempdir().unwrap();
    let audit = backups.path().join("audit.jsonl");

    let file = work.path().join("junk.tmp");
    fs::write(&file, "to be cleaned").unwrap();
    let item = FileItem::from_path(&file).unwrap();
    let manager = BackupManager::new(
        backups.path().to_path_buf(),
        Arc::new(BackupLockRegistry::new()),
        None,
    );
    let receipt = manager.create_backup("it-task", &[item]).unwrap();
    assert_eq!(receipt.status, BackupStatus::Complete);

    let envs = [
        ("SWS_BACKUP_DIR", backups.path().to_str().unwrap()),
        ("SWS_AUDIT_LOG", audit.to_str().unwrap()),
    ];
    let result = common::run_cli_case_env(
        "backups_listing_reflects_library_created_backups",
        &["--json", "backups"],
        &envs,
    );
    assert!(
        result.status.success(),
        "backups failed; log: {}",
        result.log_path.display()
    );

    let rows: Value = serde_json::from_str(&result.stdout).expect("json listing");
    let rows = rows.as_array().expect("array of backups");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["backupId"], receipt.manifest.backup_id);
    assert_eq!(rows[0]["taskId"], "it-task");
    assert_eq!(rows[0]["isValid"], true);
}

#[test]
fn cli_restore_round_trip() {
    let work = tempfile::tempdir().unwrap();
    let backups = tempfile::tempdir().unwrap();
    let audit = backups.path().join("audit.jsonl");

    let file = work.path().join("precious.log");
    fs::write(&file, "log contents").unwrap();
    let item = FileItem::from_path(&file).unwrap();
    let manager = BackupManager::new(
        backups.path().to_path_buf(),
        Arc::new(BackupLockRegistry::new()),
        None,
    );
    let receipt = manager.create_backup("it-restore", &[item]).unwrap();

    fs::remove_file(&file).unwrap();

    let envs = [
        ("SWS_BACKUP_DIR", backups.path().to_str().unwrap()),
        ("SWS_AUDIT_LOG", audit.to_str().unwrap()),
    ];
    let result = common::run_cli_case_env(
        "cli_restore_round_trip",
        &["--json", "restore", &receipt.manifest.backup_id],
        &envs,
    );
    assert!(
        result.status.success(),
        "restore failed; log: {}",
        result.log_path.display()
    );
    assert_eq!(fs::read_to_string(&file).unwrap(), "log contents");

    let payload: Value = serde_json::from_str(&result.stdout).expect("restore json");
    assert_eq!(payload["restored"], 1);
    assert_eq!(payload["failed"], 0);

    // Restore writes to the audit log.
    let audit_contents = fs::read_to_string(&audit).unwrap();
    assert!(audit_contents.contains("backup_restored"));
}

#[test]
fn cli_delete_reports_missing_backup() {
    let backups = tempfile::tempdir().unwrap();
    let audit = backups.path().join("audit.jsonl");
    let envs = [
        ("SWS_BACKUP_DIR", backups.path().to_str().unwrap()),
        ("SWS_AUDIT_LOG", audit.to_str().unwrap()),
    ];
    let result = common::run_cli_case_env(
        "cli_delete_reports_missing_backup",
        &["delete", "20990101_000000"],
        &envs,
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
}

#[test]
fn cli_classify_flags_temp_files_as_safe() {
    let work = tempfile::tempdir().unwrap();
    let tmp = work.path().join("scratch.tmp");
    let pdf = work.path().join("keep.pdf");
    fs::write(&tmp, "x").unwrap();
    fs::write(&pdf, "y").unwrap();

    let result = common::run_cli_case(
        "cli_classify_flags_temp_files_as_safe",
        &[
            "--json",
            "classify",
            tmp.to_str().unwrap(),
            pdf.to_str().unwrap(),
        ],
    );
    assert!(
        result.status.success(),
        "classify failed; log: {}",
        result.log_path.display()
    );
    let rows: Value = serde_json::from_str(&result.stdout).expect("classify json");
    let rows = rows.as_array().expect("array of verdicts");
    assert_eq!(rows[0]["verdict"], "safe");
    assert_eq!(rows[1]["verdict"], "confirm");
}

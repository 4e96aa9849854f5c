//! Top-level CLI definition and dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde_json::json;
use thiserror::Error;

use sweepsafe::backup::locks::BackupLockRegistry;
use sweepsafe::backup::rollback::RollbackManager;
use sweepsafe::core::config::Config;
use sweepsafe::core::paths::resolve_absolute_path;
use sweepsafe::logger::jsonl::AuditLogConfig;
use sweepsafe::logger::{AuditLoggerHandle, spawn_audit_logger};
use sweepsafe::model::{FileItem, Verdict};
use sweepsafe::rules::duplicates::DuplicateSet;

/// SweepSafe — safety classification and rollback for disk cleanup.
#[derive(Debug, Parser)]
#[command(
    name = "sws",
    author,
    version,
    about = "SweepSafe - safe deletion verdicts and backup rollback",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List all backups, newest first.
    Backups,
    /// Show the manifest of one backup.
    Show(ShowArgs),
    /// Restore files from a backup to their original locations.
    Restore(RestoreArgs),
    /// Delete a backup (file tree and manifest).
    Delete(DeleteArgs),
    /// Remove backups older than the retention period.
    Prune(PruneArgs),
    /// Classify paths: would sws delete them?
    Classify(ClassifyArgs),
}

#[derive(Debug, Clone, Args)]
struct ShowArgs {
    /// Backup id, e.g. 20260301_120000.
    backup_id: String,
}

#[derive(Debug, Clone, Args)]
struct RestoreArgs {
    backup_id: String,
    /// Restore only these original paths (repeatable). Default: everything.
    #[arg(long = "path", value_name = "PATH")]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct DeleteArgs {
    backup_id: String,
}

#[derive(Debug, Clone, Args)]
struct PruneArgs {
    /// Retention in days. Default: the configured retention period.
    #[arg(long, value_name = "DAYS")]
    days: Option<u32>,
}

#[derive(Debug, Clone, Args)]
struct ClassifyArgs {
    /// Paths to evaluate.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) => 2,
            Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let (audit, audit_join) = spawn_audit_logger(AuditLogConfig {
        path: config.paths.audit_log.clone(),
        ..AuditLogConfig::default()
    });

    let result = dispatch(cli, &config, &audit);

    audit.shutdown();
    let _ = audit_join.join();
    result
}

fn dispatch(cli: &Cli, config: &Config, audit: &AuditLoggerHandle) -> Result<(), CliError> {
    let rollback = RollbackManager::new(
        config.backup.dir.clone(),
        Arc::new(BackupLockRegistry::new()),
        Some(audit.clone()),
    );

    match &cli.command {
        Command::Backups => run_backups(cli, &rollback),
        Command::Show(args) => run_show(cli, &rollback, args),
        Command::Restore(args) => run_restore(cli, &rollback, args),
        Command::Delete(args) => run_delete(cli, &rollback, args),
        Command::Prune(args) => run_prune(cli, config, &rollback, args),
        Command::Classify(args) => run_classify(cli, config, args),
    }
}

const fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn run_backups(cli: &Cli, rollback: &RollbackManager) -> Result<(), CliError> {
    let backups = rollback.list_backups();
    match output_mode(cli) {
        OutputMode::Human => {
            if backups.is_empty() {
                println!("no backups");
                return Ok(());
            }
            println!(
                "{:<22} {:<22} {:>10} {:>6}  {}",
                "BACKUP ID", "CREATED", "SIZE", "FILES", "TASK"
            );
            for b in &backups {
                let id = if b.is_valid {
                    b.backup_id.normal()
                } else {
                    format!("{} (invalid)", b.backup_id).red()
                };
                println!(
                    "{:<22} {:<22} {:>10} {:>6}  {}",
                    id,
                    b.created_time.format("%Y-%m-%d %H:%M:%S"),
                    human_size(b.total_size),
                    b.file_count,
                    b.task_id
                );
            }
        }
        OutputMode::Json => {
            let rows: Vec<_> = backups
                .iter()
                .map(|b| {
                    json!({
                        "backupId": b.backup_id,
                        "createdTime": b.created_time.to_rfc3339(),
                        "taskId": b.task_id,
                        "totalSize": b.total_size,
                        "fileCount": b.file_count,
                        "isValid": b.is_valid,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn run_show(cli: &Cli, rollback: &RollbackManager, args: &ShowArgs) -> Result<(), CliError> {
    let Some(info) = rollback.get_backup_info(&args.backup_id) else {
        return Err(CliError::User(format!(
            "backup {} not found",
            args.backup_id
        )));
    };
    match output_mode(cli) {
        OutputMode::Human => {
            let m = &info.manifest;
            println!("backup:  {}", m.backup_id);
            println!("created: {}", m.created_time.format("%Y-%m-%d %H:%M:%S"));
            println!("task:    {}", m.task_id);
            println!("size:    {}", human_size(m.total_size));
            println!(
                "valid:   {}",
                if info.is_valid {
                    "yes".green()
                } else {
                    "no (file tree missing)".red()
                }
            );
            println!("files:");
            for entry in &m.files {
                let kind = if entry.is_directory { "dir " } else { "file" };
                println!(
                    "  {kind} {:>10}  {}",
                    human_size(entry.size),
                    entry.original_path.display()
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "manifest": info.manifest,
                "isValid": info.is_valid,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

fn run_restore(cli: &Cli, rollback: &RollbackManager, args: &RestoreArgs) -> Result<(), CliError> {
    let selection = (!args.paths.is_empty()).then_some(args.paths.as_slice());
    let report = rollback
        .restore_backup(&args.backup_id, selection)
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "restored {} file(s), {} failed",
                report.restored, report.failed
            );
            for err in &report.errors {
                eprintln!("  {}", err.yellow());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "backupId": args.backup_id,
                "restored": report.restored,
                "failed": report.failed,
                "errors": report.errors,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    if report.failed > 0 && report.is_success() {
        return Err(CliError::Partial(format!(
            "{} of {} entries failed",
            report.failed,
            report.restored + report.failed
        )));
    }
    if report.failed > 0 {
        return Err(CliError::Runtime("restore failed".to_string()));
    }
    Ok(())
}

fn run_delete(cli: &Cli, rollback: &RollbackManager, args: &DeleteArgs) -> Result<(), CliError> {
    let removed = rollback
        .delete_backup(&args.backup_id)
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    match output_mode(cli) {
        OutputMode::Human => {
            if removed {
                println!("deleted backup {}", args.backup_id);
            } else {
                println!("backup {} not found", args.backup_id);
            }
        }
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "backupId": args.backup_id,
                    "deleted": removed,
                }))?
            );
        }
    }
    if removed {
        Ok(())
    } else {
        Err(CliError::User(format!(
            "backup {} not found",
            args.backup_id
        )))
    }
}

fn run_prune(
    cli: &Cli,
    config: &Config,
    rollback: &RollbackManager,
    args: &PruneArgs,
) -> Result<(), CliError> {
    let days = args.days.unwrap_or(config.backup.retention_days);
    let removed = rollback.prune_older_than(days);
    match output_mode(cli) {
        OutputMode::Human => {
            println!("pruned {removed} backup(s) older than {days} day(s)");
        }
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "days": days,
                    "removed": removed,
                }))?
            );
        }
    }
    Ok(())
}

fn run_classify(cli: &Cli, config: &Config, args: &ClassifyArgs) -> Result<(), CliError> {
    let engine = config.build_engine();
    let resolver = config.build_resolver();

    let mut items = Vec::new();
    for path in &args.paths {
        // Verdicts are computed over absolute paths; a relative argument
        // would dodge the protected-root and exclusion checks.
        match FileItem::from_path(resolve_absolute_path(path)) {
            Ok(item) => items.push(item),
            Err(e) => return Err(CliError::User(e.to_string())),
        }
    }
    let duplicate_sets: Vec<DuplicateSet> = resolver.group(&items);

    let mut rows = Vec::new();
    for item in &items {
        let eval = engine.evaluate(item, &duplicate_sets);
        rows.push((item.path.clone(), eval));
    }

    match output_mode(cli) {
        OutputMode::Human => {
            for (path, eval) in &rows {
                let verdict = match eval.verdict {
                    Verdict::Safe => "safe".green(),
                    Verdict::Confirm => "confirm".yellow(),
                    Verdict::Forbid => "forbid".red(),
                };
                println!("{verdict:>8}  {}  ({})", path.display(), eval.reason);
            }
        }
        OutputMode::Json => {
            let payload: Vec<_> = rows
                .iter()
                .map(|(path, eval)| {
                    json!({
                        "path": path,
                        "verdict": eval.verdict,
                        "reason": eval.reason,
                        "matchedRule": eval.matched_rule,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

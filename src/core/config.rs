//! Configuration system: TOML file + env var overrides + smart defaults.
//!
//! Configuration is loaded once and handed to components explicitly at
//! construction; nothing in this crate reads a process-wide mutable config.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SwsError};
use crate::model::CleanCategory;
use crate::rules::duplicates::{DuplicateResolver, KeepStrategy};
use crate::rules::engine::RuleEngine;
use crate::rules::rule::{Rule, RuleSpec, validate_glob_pattern};

/// Default backup retention period in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Default minimum file size (bytes) before duplicate hashing kicks in.
pub const DEFAULT_MIN_HASH_SIZE_BYTES: u64 = 1024 * 1024;

/// Full SweepSafe configuration model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backup: BackupConfig,
    pub engine: EngineConfig,
    pub duplicates: DuplicateConfig,
    pub paths: PathsConfig,
}

/// Backup directory and retention policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupConfig {
    /// Base directory holding sidecar manifests and backup file-trees.
    pub dir: PathBuf,
    /// Backups older than this many days are pruned. Zero disables pruning.
    pub retention_days: u32,
    /// Whether clean operations create backups at all.
    pub enabled: bool,
}

/// Rule set, exclusion list, and scan-only category flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Loosely-typed rule records, validated at load time.
    pub rules: Vec<RuleSpec>,
    /// Directories whose contents are never deletable.
    pub excluded_paths: Vec<PathBuf>,
    /// Categories that only label matches, never authorize deletion.
    pub scan_only_categories: Vec<CleanCategory>,
}

/// Duplicate-file handling knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DuplicateConfig {
    pub keep_strategy: KeepStrategy,
    pub min_hash_size_bytes: u64,
}

/// Filesystem paths used by sws itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub audit_log: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: data_dir().join("backups"),
            retention_days: DEFAULT_RETENTION_DAYS,
            enabled: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: default_rule_specs(),
            excluded_paths: Vec::new(),
            scan_only_categories: vec![CleanCategory::LargeFiles],
        }
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            keep_strategy: KeepStrategy::First,
            min_hash_size_bytes: DEFAULT_MIN_HASH_SIZE_BYTES,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            config_file: home.join(".config").join("sws").join("config.toml"),
            audit_log: data_dir().join("audit.jsonl"),
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[SWS-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("sws")
}

fn default_rule_specs() -> Vec<RuleSpec> {
    let mk = |name: &str, pattern: &str, category: &str, description: &str| RuleSpec {
        name: name.to_string(),
        pattern: pattern.to_string(),
        category: category.to_string(),
        enabled: true,
        description: description.to_string(),
    };
    vec![
        mk("temp-tmp", "*.tmp", "temp_files", "editor/installer scratch files"),
        mk("temp-temp", "*.temp", "temp_files", ""),
        mk("temp-tilde", "~*", "temp_files", "office lock files"),
        mk("temp-bak", "*.bak", "temp_files", ""),
        mk("log-files", "*.log", "log_files", ""),
        mk("rotated-logs", "*.log.?", "log_files", "numbered log rotations"),
        mk(
            "python-bytecode",
            "**/__pycache__/**",
            "development_cache",
            "",
        ),
        mk(
            "node-modules",
            "**/node_modules/**",
            "development_cache",
            "",
        ),
        mk("partial-download", "*.part", "download_temp", ""),
        mk("chrome-download", "*.crdownload", "download_temp", ""),
        mk("thumbs-db", "Thumbs.db", "system_cache", "explorer thumbnail cache"),
    ]
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used. An explicit path that does not exist is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SwsError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(SwsError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate loose records into closed [`Rule`] values.
    ///
    /// Unrecognized shapes (empty name, unknown category) are excluded with a
    /// warning; patterns that will never compile get a warning but the rule
    /// is kept fail-closed.
    #[must_use]
    pub fn compiled_rules(&self) -> Vec<Rule> {
        let mut rules = Vec::with_capacity(self.engine.rules.len());
        for spec in &self.engine.rules {
            match Rule::from_spec(spec) {
                Some(rule) => {
                    if let Err(err) = validate_glob_pattern(&spec.pattern) {
                        eprintln!(
                            "[SWS-CONFIG] WARNING: rule {:?} has a pattern that never matches: {err}",
                            spec.name
                        );
                    }
                    rules.push(rule);
                }
                None => {
                    eprintln!(
                        "[SWS-CONFIG] WARNING: rejecting malformed rule record \
                         (name {:?}, category {:?})",
                        spec.name, spec.category
                    );
                }
            }
        }
        rules
    }

    /// Construct a [`RuleEngine`] from this configuration.
    #[must_use]
    pub fn build_engine(&self) -> RuleEngine {
        RuleEngine::new(
            self.compiled_rules(),
            self.engine.excluded_paths.clone(),
            self.engine.scan_only_categories.iter().copied(),
            self.duplicates.keep_strategy,
        )
    }

    /// Construct a [`DuplicateResolver`] from this configuration.
    #[must_use]
    pub const fn build_resolver(&self) -> DuplicateResolver {
        DuplicateResolver::new(self.duplicates.min_hash_size_bytes)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_path("SWS_BACKUP_DIR", &mut self.backup.dir);
        set_env_u32("SWS_RETENTION_DAYS", &mut self.backup.retention_days)?;
        set_env_path("SWS_AUDIT_LOG", &mut self.paths.audit_log);
        if let Ok(raw) = env::var("SWS_KEEP_STRATEGY") {
            self.duplicates.keep_strategy =
                raw.parse().map_err(|details| SwsError::InvalidConfig {
                    details,
                })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.backup.dir.as_os_str().is_empty() {
            return Err(SwsError::InvalidConfig {
                details: "backup.dir must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for spec in &self.engine.rules {
            if !spec.name.trim().is_empty() && !seen.insert(spec.name.as_str()) {
                return Err(SwsError::InvalidConfig {
                    details: format!("duplicate rule name {:?}", spec.name),
                });
            }
        }
        Ok(())
    }
}

fn set_env_path(key: &str, target: &mut PathBuf) {
    if let Some(raw) = env::var_os(key) {
        *target = PathBuf::from(raw);
    }
}

fn set_env_u32(key: &str, target: &mut u32) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw.parse().map_err(|_| SwsError::InvalidConfig {
            details: format!("{key} must be an unsigned integer, got {raw:?}"),
        })?;
    }
    Ok(())
}

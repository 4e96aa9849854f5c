//! Deletability rule engine.
//!
//! Verdict precedence (highest wins):
//! 1. protected root / excluded path     -> Forbid
//! 2. scan-only category match           -> Forbid (informational only)
//! 3. duplicate-set membership           -> keep-strategy verdict
//! 4. enabled non-scan-only rule match   -> Safe
//! 5. no determination                   -> Confirm
//!
//! Every ambiguity resolves toward NOT deleting: protected paths veto
//! everything, scan-only is a hard override rather than a confirmation step,
//! and modification-time ties inside a duplicate set retain all tied files.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::paths::is_under;
use crate::model::{CleanCategory, FileItem, Verdict};
use crate::rules::duplicates::{DuplicateSet, KeepStrategy};
use crate::rules::rule::Rule;

/// Hard-coded roots that are never eligible for deletion, regardless of rule
/// configuration: operating-system directories, program-install directories,
/// and program-data roots.
pub const PROTECTED_ROOTS: &[&str] = &[
    // Unix system roots
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/lib",
    "/lib64",
    "/opt",
    "/proc",
    "/run",
    "/sbin",
    "/sys",
    "/usr",
    "/var/lib",
    // macOS
    "/System",
    "/Library",
    "/Applications",
    // Windows
    "C:/Windows",
    "C:/Program Files",
    "C:/Program Files (x86)",
    "C:/ProgramData",
];

/// Outcome of evaluating one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// Human-readable explanation of the decisive check.
    pub reason: String,
    /// Name of the rule that matched, when a rule drove the verdict.
    pub matched_rule: Option<String>,
}

/// Evaluates files against the rule set, exclusion list, and duplicate sets.
///
/// Configuration is passed in at construction; the engine holds no hidden
/// state and its verdicts are pure with respect to its explicit inputs.
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    excluded_paths: Vec<PathBuf>,
    scan_only: BTreeSet<CleanCategory>,
    keep_strategy: KeepStrategy,
}

impl RuleEngine {
    #[must_use]
    pub fn new(
        rules: Vec<Rule>,
        excluded_paths: Vec<PathBuf>,
        scan_only: impl IntoIterator<Item = CleanCategory>,
        keep_strategy: KeepStrategy,
    ) -> Self {
        Self {
            rules,
            excluded_paths,
            scan_only: scan_only.into_iter().collect(),
            keep_strategy,
        }
    }

    /// Boolean core contract: may this file be deleted?
    #[must_use]
    pub fn can_delete(&self, file: &FileItem, duplicate_sets: &[DuplicateSet]) -> bool {
        self.evaluate(file, duplicate_sets).verdict == Verdict::Safe
    }

    /// Full evaluation with verdict and reason.
    #[must_use]
    pub fn evaluate(&self, file: &FileItem, duplicate_sets: &[DuplicateSet]) -> Evaluation {
        if let Some(root) = protected_root_for(&file.path) {
            return Evaluation {
                verdict: Verdict::Forbid,
                reason: format!("path is under protected root {root}"),
                matched_rule: None,
            };
        }

        if let Some(excluded) = self
            .excluded_paths
            .iter()
            .find(|ex| is_under(&file.path, ex))
        {
            return Evaluation {
                verdict: Verdict::Forbid,
                reason: format!("path is under excluded directory {}", excluded.display()),
                matched_rule: None,
            };
        }

        // Scan-only categories are a hard override: a match labels the file
        // but removes it from deletion eligibility entirely.
        if let Some(rule) = self
            .enabled_matches(&file.path)
            .find(|rule| self.scan_only.contains(&rule.category()))
        {
            return Evaluation {
                verdict: Verdict::Forbid,
                reason: format!(
                    "matched scan-only category {} via rule {}",
                    rule.category().label(),
                    rule.name()
                ),
                matched_rule: Some(rule.name().to_string()),
            };
        }

        // Duplicate membership pre-empts category rules.
        if let Some(set) = duplicate_sets.iter().find(|set| set.contains(&file.path)) {
            let deletable = set
                .deletable(&file.path, self.keep_strategy)
                .unwrap_or(false);
            let verdict = if deletable {
                Verdict::Safe
            } else {
                Verdict::Confirm
            };
            return Evaluation {
                verdict,
                reason: format!(
                    "duplicate set of {} under keep-strategy {:?}: {}",
                    set.len(),
                    self.keep_strategy,
                    if deletable { "redundant copy" } else { "retained copy" }
                ),
                matched_rule: None,
            };
        }

        if let Some(rule) = self.enabled_matches(&file.path).next() {
            return Evaluation {
                verdict: Verdict::Safe,
                reason: format!("matched rule {}", rule.name()),
                matched_rule: Some(rule.name().to_string()),
            };
        }

        Evaluation {
            verdict: Verdict::Confirm,
            reason: "no rule matched".to_string(),
            matched_rule: None,
        }
    }

    /// Rules currently carried by the engine.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Keep-strategy applied to duplicate sets.
    #[must_use]
    pub const fn keep_strategy(&self) -> KeepStrategy {
        self.keep_strategy
    }

    fn enabled_matches<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.is_enabled() && rule.matches(path))
    }
}

fn protected_root_for(path: &Path) -> Option<&'static str> {
    PROTECTED_ROOTS
        .iter()
        .find(|root| is_under(path, Path::new(root)))
        .copied()
}

//! Rule definitions: loosely-typed config records validated into closed,
//! immutable matching policies.
//!
//! A rule's pattern is a shell-style glob compiled to a case-insensitive
//! regex at construction time. A pattern that fails to compile produces a
//! never-matching rule (fail closed) rather than an error: a broken pattern
//! must never make a file appear deletable.

#![allow(missing_docs)]

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SwsError};
use crate::model::CleanCategory;

/// Loosely-typed rule record as it arrives from configuration.
///
/// `category` is a free string here; validation into the closed
/// [`CleanCategory`] set happens in [`Rule::from_spec`]. Unrecognized shapes
/// are rejected with a warning and excluded, never silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
    pub category: String,
    pub enabled: bool,
    pub description: String,
}

impl Default for RuleSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            pattern: String::new(),
            category: String::new(),
            enabled: true,
            description: String::new(),
        }
    }
}

/// An immutable matching policy: pattern + category + enabled flag.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    pattern: CompiledPattern,
    category: CleanCategory,
    enabled: bool,
    description: String,
}

impl Rule {
    /// Validate a loose [`RuleSpec`] into a closed `Rule`.
    ///
    /// Returns `None` when the record's shape is unusable (empty name or an
    /// unrecognized category string). A malformed *pattern* is not a
    /// rejection: the rule is kept with a never-matching pattern.
    #[must_use]
    pub fn from_spec(spec: &RuleSpec) -> Option<Self> {
        if spec.name.trim().is_empty() {
            return None;
        }
        let category = parse_category(&spec.category)?;
        Some(Self::new(
            &spec.name,
            &spec.pattern,
            category,
            spec.enabled,
            &spec.description,
        ))
    }

    /// Build a rule directly. The pattern compiles fail-closed.
    #[must_use]
    pub fn new(
        name: &str,
        pattern: &str,
        category: CleanCategory,
        enabled: bool,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            pattern: CompiledPattern::compile(pattern),
            category,
            enabled,
            description: description.to_string(),
        }
    }

    /// Whether this rule matches the given path.
    ///
    /// Patterns containing a path separator match against the whole
    /// normalized path; bare patterns match against the file name only.
    /// Evaluation errors are swallowed as "no match".
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.pattern.matches(path)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn category(&self) -> CleanCategory {
        self.category
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the pattern compiled successfully (diagnostic only; a rule
    /// with a broken pattern simply never matches).
    #[must_use]
    pub const fn pattern_ok(&self) -> bool {
        self.pattern.compiled.is_some()
    }
}

fn parse_category(raw: &str) -> Option<CleanCategory> {
    match raw.trim().to_lowercase().as_str() {
        "temp_files" => Some(CleanCategory::TempFiles),
        "log_files" => Some(CleanCategory::LogFiles),
        "system_cache" => Some(CleanCategory::SystemCache),
        "download_temp" => Some(CleanCategory::DownloadTemp),
        "development_cache" => Some(CleanCategory::DevelopmentCache),
        "large_files" => Some(CleanCategory::LargeFiles),
        "duplicate_files" => Some(CleanCategory::DuplicateFiles),
        "other" => Some(CleanCategory::Other),
        _ => None,
    }
}

/// A glob pattern compiled once at rule construction.
#[derive(Debug, Clone)]
struct CompiledPattern {
    raw: String,
    compiled: Option<Regex>,
    full_path: bool,
}

impl CompiledPattern {
    fn compile(raw: &str) -> Self {
        let full_path = raw.contains('/') || raw.contains('\\');
        let compiled = glob_to_regex(raw).ok();
        Self {
            raw: raw.to_string(),
            compiled,
            full_path,
        }
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(re) = &self.compiled else {
            // Fail closed: broken patterns never match.
            return false;
        };
        let haystack = if self.full_path {
            path.to_string_lossy().replace('\\', "/")
        } else {
            match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => return false,
            }
        };
        re.is_match(&haystack)
    }
}

/// Validate that a glob pattern compiles; used by config validation to warn
/// early about rules that will never match.
pub fn validate_glob_pattern(pattern: &str) -> Result<()> {
    glob_to_regex(pattern).map(|_| ())
}

/// Convert a shell-style glob pattern to a case-insensitive anchored regex.
///
/// Supports:
/// - `**` → matches any path (including separators)
/// - `*`  → matches anything except `/`
/// - `?`  → matches a single character except `/`
///
/// Every regex metacharacter is escaped, so the only rejected input is an
/// empty (or whitespace-only) pattern, which can never name a file. Rules
/// carrying one take the never-matching path.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    if pattern.trim().is_empty() {
        return Err(SwsError::InvalidPattern {
            pattern: pattern.to_string(),
            details: "empty pattern".to_string(),
        });
    }
    let normalized = pattern.replace('\\', "/");
    let mut regex_str = String::with_capacity(pattern.len() * 2 + 6);
    regex_str.push_str("(?i)^");

    let chars: Vec<char> = normalized.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                if i + 2 < chars.len() && chars[i + 2] == '/' {
                    regex_str.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex_str.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex_str.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex_str.push_str("[^/]");
                i += 1;
            }
            '.' | '+' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '$' | '|' | '\\' => {
                regex_str.push('\\');
                regex_str.push(chars[i]);
                i += 1;
            }
            c => {
                regex_str.push(c);
                i += 1;
            }
        }
    }

    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| SwsError::InvalidPattern {
        pattern: pattern.to_string(),
        details: err.to_string(),
    })
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.name,
            self.pattern.raw,
            self.category.label()
        )
    }
}

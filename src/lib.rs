#![forbid(unsafe_code)]

//! SweepSafe (sws) — safety classification and rollback for disk cleanup.
//!
//! Two halves, both in service of never losing a file the user wanted:
//! 1. **Rules** — pattern-based safety verdicts over cleanup candidates,
//!    including duplicate-set resolution with a configurable keep strategy
//! 2. **Backup** — structural copies of files about to be deleted, with
//!    sidecar manifests, restore, and retention pruning
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use sweepsafe::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use sweepsafe::core::config::Config;
//! use sweepsafe::backup::rollback::RollbackManager;
//! ```

pub mod prelude;

pub mod backup;
pub mod core;
pub mod logger;
pub mod model;
pub mod rules;

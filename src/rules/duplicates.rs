//! Duplicate resolution: content-signature grouping and keep-strategy
//! selection.
//!
//! Files are grouped by (size, sha256). Hashing is lazy twice over: a file is
//! only hashed when its size collides with another candidate's, and never
//! when it is below the configured minimum size. A hash failure for one file
//! (permissions, transient I/O) excludes only that file from grouping.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::FileItem;

/// Policy selecting which member of a duplicate set is retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepStrategy {
    /// Keep the first-encountered file; the rest are deletion-eligible.
    #[default]
    First,
    /// Keep the file(s) with the maximal modification time.
    Newest,
    /// Keep the file(s) with the minimal modification time.
    Oldest,
}

impl std::str::FromStr for KeepStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => Err(format!("unknown keep strategy: {other:?}")),
        }
    }
}

/// An ordered collection of files sharing a content signature. Always
/// contains at least two members; computed per scan and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSet {
    signature: String,
    files: Vec<FileItem>,
}

impl DuplicateSet {
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    #[must_use]
    pub fn files(&self) -> &[FileItem] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    /// Whether the member at `path` is deletion-eligible under `strategy`.
    ///
    /// Returns `None` if the path is not a member. Ties at the retained
    /// extreme (equal modification times) are excluded from deletion.
    #[must_use]
    pub fn deletable(&self, path: &Path, strategy: KeepStrategy) -> Option<bool> {
        let index = self.files.iter().position(|f| f.path == path)?;
        let member = &self.files[index];
        let verdict = match strategy {
            KeepStrategy::First => index > 0,
            KeepStrategy::Newest => {
                let newest = self.files.iter().map(|f| f.modified_time).max()?;
                member.modified_time < newest
            }
            KeepStrategy::Oldest => {
                let oldest = self.files.iter().map(|f| f.modified_time).min()?;
                member.modified_time > oldest
            }
        };
        Some(verdict)
    }

    /// Paths retained under `strategy` (the complement of deletion-eligible).
    #[must_use]
    pub fn retained(&self, strategy: KeepStrategy) -> Vec<&PathBuf> {
        self.files
            .iter()
            .filter(|f| self.deletable(&f.path, strategy) == Some(false))
            .map(|f| &f.path)
            .collect()
    }
}

/// Groups scan candidates into duplicate sets by content signature.
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    min_hash_size_bytes: u64,
}

impl DuplicateResolver {
    #[must_use]
    pub const fn new(min_hash_size_bytes: u64) -> Self {
        Self {
            min_hash_size_bytes,
        }
    }

    /// Group `items` into duplicate sets (minimum group size 2).
    ///
    /// Output set order is deterministic: sets appear in the order of their
    /// first member in `items`, and members keep their input order.
    #[must_use]
    pub fn group(&self, items: &[FileItem]) -> Vec<DuplicateSet> {
        // Pass 1: bucket by size so only colliding sizes pay for hashing.
        let mut by_size: HashMap<u64, Vec<&FileItem>> = HashMap::new();
        for item in items {
            if item.size >= self.min_hash_size_bytes || item.content_hash.is_some() {
                by_size.entry(item.size).or_default().push(item);
            }
        }

        // Pass 2: within each colliding bucket, resolve signatures.
        let mut sets: HashMap<String, Vec<FileItem>> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for item in items {
            let Some(bucket) = by_size.get(&item.size) else {
                continue;
            };
            if bucket.len() < 2 {
                continue;
            }
            let Some(hash) = self.signature_hash(item) else {
                continue;
            };
            let signature = format!("{}:{hash}", item.size);
            let entry = sets.entry(signature.clone()).or_default();
            if entry.is_empty() {
                order.push(signature);
            }
            entry.push(item.clone());
        }

        order
            .into_iter()
            .filter_map(|signature| {
                let files = sets.remove(&signature)?;
                (files.len() >= 2).then_some(DuplicateSet { signature, files })
            })
            .collect()
    }

    fn signature_hash(&self, item: &FileItem) -> Option<String> {
        if let Some(hash) = &item.content_hash {
            return Some(hash.clone());
        }
        if item.size < self.min_hash_size_bytes {
            return None;
        }
        match hash_file(&item.path) {
            Ok(hash) => Some(hash),
            Err(err) => {
                eprintln!(
                    "[SWS-DUP] WARNING: hashing failed for {}, excluding from grouping: {err}",
                    item.path.display()
                );
                None
            }
        }
    }
}

/// Streaming sha256 of a file's contents.
fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65_536];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

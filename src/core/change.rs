//! Type-safe working-tree change classification.
//!
//! This module defines [`ChangeKind`], the classification shown for each changed path,
//! [`ChangeEntry`], one classified path with its staged flag, and [`StatusBuckets`],
//! the raw seven-bucket status report a backend produces.
//!
//! # Public API
//! - [`ChangeKind`]: Enumeration of change classifications
//! - [`ChangeEntry`]: A path, its classification and whether it is staged
//! - [`StatusBuckets`]: Backend status grouped into the seven buckets
//!
//! # Key Features
//! - **git2 integration**: Direct bucketing of `git2::Status` flags
//! - **Bucket mapping**: Each bucket fixes both the classification and the staged flag
//! - **Display formatting**: Consistent labels for UI output

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Classification of a changed working-tree path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// New file recorded in the index (A)
    Added,
    /// Content changed, staged or not (M)
    Modified,
    /// Removal recorded in the index (D)
    Deleted,
    /// Not tracked yet (??)
    Untracked,
    /// Unresolved merge conflict (UU)
    Conflicting,
    /// Tracked but gone from disk, removal not staged (!)
    Missing,
}

impl ChangeKind {
    /// Short status code for compact display
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "A",
            ChangeKind::Modified => "M",
            ChangeKind::Deleted => "D",
            ChangeKind::Untracked => "??",
            ChangeKind::Conflicting => "UU",
            ChangeKind::Missing => "!",
        }
    }

    /// Human-readable label
    pub fn display_name(&self) -> &'static str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Modified => "Modified",
            ChangeKind::Deleted => "Deleted",
            ChangeKind::Untracked => "Untracked",
            ChangeKind::Conflicting => "Conflicting",
            ChangeKind::Missing => "Missing",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub staged: bool,
}

impl ChangeEntry {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind, staged: bool) -> Self {
        Self {
            path: path.into(),
            kind,
            staged,
        }
    }
}

impl fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.staged { "✓" } else { " " };
        write!(f, "[{}] {} {}", mark, self.kind, self.path.display())
    }
}

/// Status of the working tree grouped the way the refresh pipeline consumes it.
///
/// A path may appear in more than one bucket, e.g. a new file that was staged and
/// then edited again is both `added` and `modified`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBuckets {
    /// New in the index
    pub added: BTreeSet<PathBuf>,
    /// Tracked, changed on disk, change not staged
    pub modified: BTreeSet<PathBuf>,
    /// Tracked, change staged
    pub changed: BTreeSet<PathBuf>,
    /// Removal staged
    pub removed: BTreeSet<PathBuf>,
    /// Tracked, gone from disk, removal not staged
    pub missing: BTreeSet<PathBuf>,
    /// Not tracked
    pub untracked: BTreeSet<PathBuf>,
    /// Unresolved conflicts
    pub conflicting: BTreeSet<PathBuf>,
}

impl StatusBuckets {
    /// Place one path into every bucket its git2 status flags select
    pub fn insert_git2(&mut self, path: PathBuf, flags: git2::Status) {
        if flags.contains(git2::Status::CONFLICTED) {
            // Index flags of a conflicted entry describe the merge stages, not a staged change
            self.conflicting.insert(path);
            return;
        }

        if flags.contains(git2::Status::INDEX_NEW) {
            self.added.insert(path.clone());
        }
        if flags.intersects(
            git2::Status::INDEX_MODIFIED | git2::Status::INDEX_RENAMED | git2::Status::INDEX_TYPECHANGE,
        ) {
            self.changed.insert(path.clone());
        }
        if flags.contains(git2::Status::INDEX_DELETED) {
            self.removed.insert(path.clone());
        }

        if flags.contains(git2::Status::WT_NEW) {
            self.untracked.insert(path.clone());
        }
        if flags.intersects(
            git2::Status::WT_MODIFIED | git2::Status::WT_RENAMED | git2::Status::WT_TYPECHANGE,
        ) {
            self.modified.insert(path.clone());
        }
        if flags.contains(git2::Status::WT_DELETED) {
            self.missing.insert(path);
        }
    }

    /// Paths whose change is currently recorded in the index
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        let mut paths: BTreeSet<PathBuf> = BTreeSet::new();
        paths.extend(self.added.iter().cloned());
        paths.extend(self.changed.iter().cloned());
        paths.extend(self.removed.iter().cloned());
        paths.into_iter().collect()
    }

    /// Flatten the buckets into change entries.
    ///
    /// Bucket order is added, modified, changed, removed, missing, untracked,
    /// conflicting; paths within a bucket are sorted.
    pub fn into_entries(self) -> Vec<ChangeEntry> {
        let buckets = [
            (self.added, ChangeKind::Added, true),
            (self.modified, ChangeKind::Modified, false),
            (self.changed, ChangeKind::Modified, true),
            (self.removed, ChangeKind::Deleted, true),
            (self.missing, ChangeKind::Missing, false),
            (self.untracked, ChangeKind::Untracked, false),
            (self.conflicting, ChangeKind::Conflicting, false),
        ];

        let capacity = buckets.iter().map(|(paths, _, _)| paths.len()).sum();
        let mut entries = Vec::with_capacity(capacity);
        for (paths, kind, staged) in buckets {
            entries.extend(paths.into_iter().map(|path| ChangeEntry::new(path, kind, staged)));
        }
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.missing.is_empty()
            && self.untracked.is_empty()
            && self.conflicting.is_empty()
    }
}

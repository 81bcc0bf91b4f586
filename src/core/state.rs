//! Repository state snapshots.
//!
//! This module defines the data the refresh pipeline produces and the coordinator
//! publishes. A [`RepositoryState`] is immutable once built; every refresh cycle
//! replaces the whole snapshot instead of patching it.
//!
//! # Public API
//! - [`CommitRecord`]: One commit from the log
//! - [`RepositoryState`]: Complete, consistent view of the repository

use crate::core::change::ChangeEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const SHORT_ID_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub short_id: String,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitRecord {
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let id = id.into();
        let short_id = short_id(&id);
        Self {
            id,
            short_id,
            author: author.into(),
            message: message.into(),
            timestamp,
        }
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}: {}", self.short_id, self.author, self.message)
    }
}

/// First seven characters of a commit id, or the whole id when shorter
pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryState {
    pub workdir: PathBuf,
    pub branch: String,
    pub branches: Vec<String>,
    pub changes: Vec<ChangeEntry>,
    pub commits: Vec<CommitRecord>,
    /// Number of completed refresh cycles, 0 for the placeholder snapshot
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl RepositoryState {
    /// Placeholder published before the first refresh completes
    pub fn empty(workdir: PathBuf) -> Self {
        Self {
            workdir,
            branch: String::new(),
            branches: Vec::new(),
            changes: Vec::new(),
            commits: Vec::new(),
            generation: 0,
            refreshed_at: None,
        }
    }

    pub fn staged_count(&self) -> usize {
        self.changes.iter().filter(|change| change.staged).count()
    }

    pub fn has_staged_changes(&self) -> bool {
        self.changes.iter().any(|change| change.staged)
    }

    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }
}

//! The version-control capability the engine is built on.
//!
//! The coordinator never talks to libgit2 directly; it drives a boxed
//! [`VersionControlBackend`]. [`crate::core::git::GitRepo`] is the production
//! implementation, tests substitute recording fakes.
//!
//! Implementations are blocking and are only ever called from the coordinator's
//! worker thread, so they need to be `Send` but not `Sync`.

use crate::core::{
    change::StatusBuckets,
    credentials::{CommitIdentity, Credentials},
    error::Result,
    state::CommitRecord,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a remote call needs besides the repository itself
#[derive(Debug, Clone, Copy)]
pub struct RemoteOptions<'a> {
    pub credentials: &'a Credentials,
    /// Remote used when the current branch has no upstream
    pub remote_name: &'a str,
    pub timeout: Option<Duration>,
    /// Author of merge commits created by pull
    pub author: &'a CommitIdentity,
}

/// What a pull did to the current branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullOutcome {
    UpToDate,
    FastForward { to: String },
    Merged { commit: String },
}

pub trait VersionControlBackend: Send {
    /// Root of the working tree this session is bound to
    fn workdir(&self) -> &Path;

    fn status(&self) -> Result<StatusBuckets>;

    fn stage(&self, paths: &[PathBuf]) -> Result<()>;

    fn unstage(&self, paths: &[PathBuf]) -> Result<()>;

    fn stage_all(&self) -> Result<()>;

    /// Commit the index; returns the new commit id
    fn commit(&self, message: &str, author: &CommitIdentity) -> Result<String>;

    fn fetch(&self, remote: &RemoteOptions<'_>) -> Result<()>;

    fn pull(&self, remote: &RemoteOptions<'_>) -> Result<PullOutcome>;

    fn push(&self, remote: &RemoteOptions<'_>) -> Result<()>;

    /// Newest first, at most `limit` entries
    fn log(&self, limit: usize) -> Result<Vec<CommitRecord>>;

    fn current_branch(&self) -> Result<String>;

    fn list_branches(&self) -> Result<Vec<String>>;

    fn create_branch(&self, name: &str) -> Result<()>;

    fn checkout(&self, name: &str) -> Result<()>;
}

//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`SyncError`] which covers every failure the synchronization
//! engine can report. It uses `thiserror` for ergonomic error definitions and includes
//! specialized constructors for the structured variants.
//!
//! # Public API
//! - [`SyncError`]: Main error enum covering all failure modes
//! - [`RemoteAction`]: Which remote operation a remote failure belongs to
//! - [`Result<T>`]: Type alias for `std::result::Result<T, SyncError>`
//!
//! # Error Categories
//! - **Open**: Not a repository, repository I/O, path already opened in this process
//! - **Remote**: Authentication, connectivity, timeouts, missing remotes, rejected pushes
//! - **Commit**: Empty message, nothing staged, backend failure
//! - **Watch**: Root directory cannot be observed
//! - **State**: Request made after the session was closed

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Remote operation a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteAction {
    Clone,
    Fetch,
    Pull,
    Push,
}

impl RemoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteAction::Clone => "clone",
            RemoteAction::Fetch => "fetch",
            RemoteAction::Pull => "pull",
            RemoteAction::Push => "push",
        }
    }
}

impl fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-specific error types for the synchronization engine
#[derive(Error, Debug)]
pub enum SyncError {
    // Open errors
    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("Cannot open repository at '{path}': {source}")]
    RepositoryIo { path: PathBuf, source: git2::Error },

    #[error("Repository at '{path}' is already open")]
    RepositoryAlreadyOpen { path: PathBuf },

    // Remote errors
    #[error("Authentication failed during {action}: {message}")]
    RemoteAuth {
        action: RemoteAction,
        message: String,
    },

    #[error("Network failure during {action}: {message}")]
    RemoteNetwork {
        action: RemoteAction,
        message: String,
    },

    #[error("{action} timed out after {}s", .timeout.as_secs())]
    RemoteTimeout {
        action: RemoteAction,
        timeout: Duration,
    },

    #[error("No remote named '{name}' is configured")]
    NoRemote { name: String },

    #[error("Push of '{reference}' was rejected: {message}")]
    PushRejected { reference: String, message: String },

    #[error("Cannot clone into '{path}': {source}")]
    CloneIo { path: PathBuf, source: git2::Error },

    #[error("Merge left {count} conflicting file(s); resolve them and commit")]
    MergeConflicts { count: usize },

    #[error("HEAD is detached; check out a branch before trying to {action}")]
    DetachedHead { action: RemoteAction },

    // Commit errors
    #[error("Commit message is empty")]
    EmptyCommitMessage,

    #[error("There are no staged changes to commit")]
    NoStagedChanges,

    #[error("Commit failed: {source}")]
    CommitFailed { source: git2::Error },

    #[error("Created commit {} but the push failed: {source}", crate::core::state::short_id(.commit))]
    PushAfterCommit {
        commit: String,
        source: Box<SyncError>,
    },

    // Watch errors
    #[error("Cannot watch '{path}': {source}")]
    WatchInit { path: PathBuf, source: notify::Error },

    #[error("Watch root '{path}' is not an existing directory")]
    WatchRootMissing { path: PathBuf },

    // Session state errors
    #[error("No repository is open")]
    NoOpenRepository,

    #[error("Failed to refresh {query}: {message}")]
    RefreshFailed { query: &'static str, message: String },

    // Generic errors
    #[error("Git repository error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid UTF-8 path in repository")]
    InvalidUtf8Path,
}

/// Convenience type alias for Results using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Create a not-a-repository error
    pub fn not_a_repository(path: impl Into<PathBuf>) -> Self {
        Self::NotARepository { path: path.into() }
    }

    /// Create a repository I/O error
    pub fn repository_io(path: impl Into<PathBuf>, source: git2::Error) -> Self {
        Self::RepositoryIo {
            path: path.into(),
            source,
        }
    }

    /// Create an already-open error
    pub fn repository_already_open(path: impl Into<PathBuf>) -> Self {
        Self::RepositoryAlreadyOpen { path: path.into() }
    }

    /// Create an authentication error for a remote action
    pub fn remote_auth(action: RemoteAction, message: impl Into<String>) -> Self {
        Self::RemoteAuth {
            action,
            message: message.into(),
        }
    }

    /// Create a connectivity error for a remote action
    pub fn remote_network(action: RemoteAction, message: impl Into<String>) -> Self {
        Self::RemoteNetwork {
            action,
            message: message.into(),
        }
    }

    /// Create a timeout error for a remote action
    pub fn remote_timeout(action: RemoteAction, timeout: Duration) -> Self {
        Self::RemoteTimeout { action, timeout }
    }

    /// Create a missing remote error
    pub fn no_remote(name: impl Into<String>) -> Self {
        Self::NoRemote { name: name.into() }
    }

    /// Create a rejected push error
    pub fn push_rejected(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PushRejected {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a clone I/O error
    pub fn clone_io(path: impl Into<PathBuf>, source: git2::Error) -> Self {
        Self::CloneIo {
            path: path.into(),
            source,
        }
    }

    /// Create a watch initialization error
    pub fn watch_init(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        Self::WatchInit {
            path: path.into(),
            source,
        }
    }

    /// Create a missing watch root error
    pub fn watch_root_missing(path: impl Into<PathBuf>) -> Self {
        Self::WatchRootMissing { path: path.into() }
    }

    /// The remote failure behind a commit whose push failed, else `self`
    fn remote_cause(&self) -> &SyncError {
        match self {
            Self::PushAfterCommit { source, .. } => source,
            other => other,
        }
    }

    /// True when the remediation is re-entering credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.remote_cause(), Self::RemoteAuth { .. })
    }

    /// True when the remediation is retrying later
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self.remote_cause(),
            Self::RemoteNetwork { .. } | Self::RemoteTimeout { .. }
        )
    }

    /// True for every failure that came from talking to (or finding) a remote
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self.remote_cause(),
            Self::RemoteAuth { .. }
                | Self::RemoteNetwork { .. }
                | Self::RemoteTimeout { .. }
                | Self::NoRemote { .. }
                | Self::PushRejected { .. }
        )
    }
}

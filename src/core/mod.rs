//! Core functionality for the git-sync engine.
//!
//! This module provides the backend abstraction and its git2 implementation, the
//! directory watcher, the refresh pipeline, the coordinator that ties them together,
//! and the configuration, error and output helpers shared by the CLI.

pub mod backend;
pub mod change;
pub mod colors;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod dirs;
pub mod error;
pub mod events;
pub mod git;
pub mod handle;
pub mod output;
pub mod refresh;
pub(crate) mod remote;
pub mod state;
pub mod watcher;

// === Error handling ===
pub use error::{RemoteAction, Result, SyncError};

// === Backend ===
// The capability the coordinator drives, and its libgit2 implementation
pub use backend::{PullOutcome, RemoteOptions, VersionControlBackend};
pub use git::GitRepo;

// === Data model ===
pub use change::{ChangeEntry, ChangeKind, StatusBuckets};
pub use credentials::{AuthMethod, CommitIdentity, Credentials, Secret};
pub use state::{CommitRecord, RepositoryState};

// === Engine ===
pub use coordinator::{Outcome, Phase, SyncCoordinator, Ticket};
pub use events::{LogLevel, LogLine, Notification};
pub use handle::RepositoryHandle;
pub use watcher::{DirectoryWatcher, WatchEvent, WatchEventKind, WatchSubscription};

// === Configuration ===
pub use config::SyncConfig;

// === Output formatting ===
pub use colors::{format_change_line, get_aligned_status, get_colored_path, get_status_color_style};
pub use output::{print_error, print_info, print_log_line, print_section_header, print_success};

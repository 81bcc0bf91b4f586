//! git-sync - A repository synchronization engine with a small command-line shell.
//!
//! This library keeps a live, consistent view of a working tree by reconciling explicit
//! user actions with filesystem events, and performs fetch, pull and push without
//! blocking the caller. All backend work is serialized on one worker thread per
//! repository.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - [`SyncCoordinator`]: open/clone a repository and queue operations on it
//! - [`VersionControlBackend`] and its git2 implementation [`GitRepo`]
//! - [`DirectoryWatcher`]: recursive filesystem observation
//! - Snapshot types, notifications, configuration and error handling

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    AuthMethod,
    ChangeEntry,
    ChangeKind,
    CommitIdentity,
    CommitRecord,
    Credentials,
    DirectoryWatcher,
    GitRepo,
    LogLevel,
    LogLine,
    Notification,
    Outcome,
    Phase,
    PullOutcome,
    RemoteAction,
    RemoteOptions,
    RepositoryHandle,
    RepositoryState,
    Result,
    StatusBuckets,
    SyncConfig,
    SyncCoordinator,
    SyncError,
    Ticket,
    VersionControlBackend,
    WatchEvent,
    WatchEventKind,
};

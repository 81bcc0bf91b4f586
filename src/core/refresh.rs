//! Rebuilding [`RepositoryState`] from backend queries.
//!
//! Each query stands alone so callers can read one part of the repository;
//! [`rebuild`] runs all of them and only produces a new snapshot when every query
//! succeeded.

use crate::core::{
    backend::VersionControlBackend,
    change::ChangeEntry,
    error::{Result, SyncError},
    state::{CommitRecord, RepositoryState},
};
use chrono::Utc;

/// Working-tree changes in bucket order
pub fn refresh_changes(backend: &dyn VersionControlBackend) -> Result<Vec<ChangeEntry>> {
    Ok(backend.status()?.into_entries())
}

/// Newest first, at most `limit`
pub fn refresh_commits(
    backend: &dyn VersionControlBackend,
    limit: usize,
) -> Result<Vec<CommitRecord>> {
    let mut commits = backend.log(limit)?;
    commits.truncate(limit);
    Ok(commits)
}

pub fn refresh_branch(backend: &dyn VersionControlBackend) -> Result<String> {
    backend.current_branch()
}

pub fn refresh_branches(backend: &dyn VersionControlBackend) -> Result<Vec<String>> {
    let mut branches = backend.list_branches()?;
    branches.sort();
    Ok(branches)
}

fn scoped<T>(query: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| SyncError::RefreshFailed {
        query,
        message: e.to_string(),
    })
}

/// Build the snapshot that follows `previous`; on failure `previous` stays current
pub fn rebuild(
    backend: &dyn VersionControlBackend,
    previous: &RepositoryState,
    commit_limit: usize,
) -> Result<RepositoryState> {
    let changes = scoped("changes", refresh_changes(backend))?;
    let commits = scoped("commits", refresh_commits(backend, commit_limit))?;
    let branch = scoped("branch", refresh_branch(backend))?;
    let branches = scoped("branches", refresh_branches(backend))?;

    Ok(RepositoryState {
        workdir: backend.workdir().to_path_buf(),
        branch,
        branches,
        changes,
        commits,
        generation: previous.generation + 1,
        refreshed_at: Some(Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        backend::{PullOutcome, RemoteOptions},
        change::{ChangeKind, StatusBuckets},
        credentials::CommitIdentity,
    };
    use std::path::{Path, PathBuf};

    struct Canned {
        workdir: PathBuf,
        fail_log: bool,
    }

    impl VersionControlBackend for Canned {
        fn workdir(&self) -> &Path {
            &self.workdir
        }

        fn status(&self) -> Result<StatusBuckets> {
            let mut buckets = StatusBuckets::default();
            buckets.untracked.insert(PathBuf::from("b.txt"));
            buckets.added.insert(PathBuf::from("a.txt"));
            Ok(buckets)
        }

        fn stage(&self, _paths: &[PathBuf]) -> Result<()> {
            Ok(())
        }

        fn unstage(&self, _paths: &[PathBuf]) -> Result<()> {
            Ok(())
        }

        fn stage_all(&self) -> Result<()> {
            Ok(())
        }

        fn commit(&self, _message: &str, _author: &CommitIdentity) -> Result<String> {
            Ok("0".repeat(40))
        }

        fn fetch(&self, _remote: &RemoteOptions<'_>) -> Result<()> {
            Ok(())
        }

        fn pull(&self, _remote: &RemoteOptions<'_>) -> Result<PullOutcome> {
            Ok(PullOutcome::UpToDate)
        }

        fn push(&self, _remote: &RemoteOptions<'_>) -> Result<()> {
            Ok(())
        }

        fn log(&self, _limit: usize) -> Result<Vec<CommitRecord>> {
            if self.fail_log {
                return Err(SyncError::InvalidUtf8Path);
            }
            Ok((0..5)
                .map(|i| CommitRecord::new(format!("{i:040}"), "dev", "msg", Utc::now()))
                .collect())
        }

        fn current_branch(&self) -> Result<String> {
            Ok("main".to_string())
        }

        fn list_branches(&self) -> Result<Vec<String>> {
            Ok(vec!["main".to_string(), "dev".to_string()])
        }

        fn create_branch(&self, _name: &str) -> Result<()> {
            Ok(())
        }

        fn checkout(&self, _name: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rebuild_collects_everything() -> Result<()> {
        let backend = Canned {
            workdir: PathBuf::from("/repo"),
            fail_log: false,
        };
        let previous = RepositoryState::empty(PathBuf::from("/repo"));

        let state = rebuild(&backend, &previous, 3)?;
        assert_eq!(state.generation, 1);
        assert_eq!(state.branch, "main");
        assert_eq!(state.branches, vec!["dev", "main"]);
        assert_eq!(state.commits.len(), 3);
        assert_eq!(state.changes[0].kind, ChangeKind::Added);
        assert_eq!(state.changes[1].kind, ChangeKind::Untracked);
        assert!(state.refreshed_at.is_some());
        Ok(())
    }

    #[test]
    fn test_rebuild_failure_names_the_query() {
        let backend = Canned {
            workdir: PathBuf::from("/repo"),
            fail_log: true,
        };
        let previous = RepositoryState::empty(PathBuf::from("/repo"));

        match rebuild(&backend, &previous, 50) {
            Err(SyncError::RefreshFailed { query, .. }) => assert_eq!(query, "commits"),
            other => panic!("expected refresh failure, got {other:?}"),
        }
    }
}

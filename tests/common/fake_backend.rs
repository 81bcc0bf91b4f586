//! In-memory backend that records every call.

#![allow(dead_code)]

use git_sync::core::error::{Result, SyncError};
use git_sync::{
    CommitIdentity, CommitRecord, PullOutcome, RemoteAction, RemoteOptions, StatusBuckets,
    VersionControlBackend,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Failure every remote call reports while set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFault {
    Auth,
    Network,
    Timeout,
}

impl RemoteFault {
    fn error(self, action: RemoteAction) -> SyncError {
        match self {
            RemoteFault::Auth => SyncError::remote_auth(action, "401 credentials rejected"),
            RemoteFault::Network => SyncError::remote_network(action, "connection reset"),
            RemoteFault::Timeout => SyncError::remote_timeout(action, Duration::from_secs(1)),
        }
    }
}

/// Shared view into a [`FakeBackend`] the test keeps after handing the backend over
#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
    pub fail_status: Arc<AtomicBool>,
    pub staged: Arc<Mutex<BTreeSet<PathBuf>>>,
    pub untracked: Arc<Mutex<BTreeSet<PathBuf>>>,
    pub commits: Arc<Mutex<Vec<CommitRecord>>>,
    pub remote_fault: Arc<Mutex<Option<RemoteFault>>>,
    /// When set, every status call starts a new epoch and log/branch answers follow it
    pub epochs: Arc<AtomicBool>,
    pub epoch: Arc<AtomicUsize>,
}

impl Recorder {
    /// Mutating calls in the order the backend saw them
    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter(|call| !is_query(call))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn fail_remote(&self, fault: Option<RemoteFault>) {
        if let Ok(mut current) = self.remote_fault.lock() {
            *current = fault;
        }
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|c| c.starts_with(prefix)).count())
            .unwrap_or(0)
    }
}

fn is_query(call: &str) -> bool {
    ["status", "log", "current_branch", "list_branches"]
        .iter()
        .any(|query| call == *query)
}

pub struct FakeBackend {
    workdir: PathBuf,
    delay: Duration,
    recorder: Recorder,
}

impl FakeBackend {
    pub fn new(workdir: &Path, delay: Duration) -> (Self, Recorder) {
        let recorder = Recorder::default();
        let backend = FakeBackend {
            workdir: workdir.to_path_buf(),
            delay,
            recorder: recorder.clone(),
        };
        (backend, recorder)
    }

    pub fn with_untracked(self, paths: &[&str]) -> Self {
        if let Ok(mut untracked) = self.recorder.untracked.lock() {
            untracked.extend(paths.iter().map(PathBuf::from));
        }
        self
    }

    fn enter(&self, call: String) -> Guard<'_> {
        let now = self.recorder.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Ok(mut calls) = self.recorder.calls.lock() {
            calls.push(call);
        }
        Guard { recorder: &self.recorder }
    }

    fn remote(&self, action: RemoteAction) -> Result<()> {
        match *self.recorder.remote_fault.lock().map_err(|_| poisoned())? {
            Some(fault) => Err(fault.error(action)),
            None => Ok(()),
        }
    }

    fn current_epoch(&self) -> Option<usize> {
        self.recorder
            .epochs
            .load(Ordering::SeqCst)
            .then(|| self.recorder.epoch.load(Ordering::SeqCst))
    }

    fn slow(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

struct Guard<'a> {
    recorder: &'a Recorder,
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        self.recorder.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn poisoned() -> SyncError {
    SyncError::InvalidUtf8Path
}

impl VersionControlBackend for FakeBackend {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn status(&self) -> Result<StatusBuckets> {
        let _guard = self.enter("status".to_string());
        if self.recorder.fail_status.load(Ordering::SeqCst) {
            return Err(SyncError::Io(std::io::Error::other("status unavailable")));
        }
        if self.recorder.epochs.load(Ordering::SeqCst) {
            self.recorder.epoch.fetch_add(1, Ordering::SeqCst);
        }

        let mut buckets = StatusBuckets::default();
        buckets.added = self.recorder.staged.lock().map_err(|_| poisoned())?.clone();
        buckets.untracked = self.recorder.untracked.lock().map_err(|_| poisoned())?.clone();
        Ok(buckets)
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let _guard = self.enter(format!("stage {}", names.join(",")));
        self.slow();

        let mut untracked = self.recorder.untracked.lock().map_err(|_| poisoned())?;
        let mut staged = self.recorder.staged.lock().map_err(|_| poisoned())?;
        for path in paths {
            if untracked.remove(path) {
                staged.insert(path.clone());
            }
        }
        Ok(())
    }

    fn unstage(&self, paths: &[PathBuf]) -> Result<()> {
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let _guard = self.enter(format!("unstage {}", names.join(",")));
        self.slow();

        let mut untracked = self.recorder.untracked.lock().map_err(|_| poisoned())?;
        let mut staged = self.recorder.staged.lock().map_err(|_| poisoned())?;
        for path in paths {
            if staged.remove(path) {
                untracked.insert(path.clone());
            }
        }
        Ok(())
    }

    fn stage_all(&self) -> Result<()> {
        let _guard = self.enter("stage_all".to_string());
        let mut untracked = self.recorder.untracked.lock().map_err(|_| poisoned())?;
        let mut staged = self.recorder.staged.lock().map_err(|_| poisoned())?;
        staged.append(&mut untracked);
        Ok(())
    }

    fn commit(&self, message: &str, author: &CommitIdentity) -> Result<String> {
        let _guard = self.enter(format!("commit {message}"));
        self.slow();

        let mut staged = self.recorder.staged.lock().map_err(|_| poisoned())?;
        if staged.is_empty() {
            return Err(SyncError::NoStagedChanges);
        }
        staged.clear();

        let mut commits = self.recorder.commits.lock().map_err(|_| poisoned())?;
        let id = format!("{:040x}", commits.len() + 1);
        commits.insert(
            0,
            CommitRecord::new(id.clone(), author.name.clone(), message, chrono::Utc::now()),
        );
        Ok(id)
    }

    fn fetch(&self, _remote: &RemoteOptions<'_>) -> Result<()> {
        let _guard = self.enter("fetch".to_string());
        self.slow();
        self.remote(RemoteAction::Fetch)
    }

    fn pull(&self, remote: &RemoteOptions<'_>) -> Result<PullOutcome> {
        let _guard = self.enter("pull".to_string());
        self.slow();
        self.remote(RemoteAction::Pull)?;
        Err(SyncError::no_remote(remote.remote_name))
    }

    fn push(&self, remote: &RemoteOptions<'_>) -> Result<()> {
        let _guard = self.enter(format!("push as {}", remote.credentials.username()));
        self.slow();
        self.remote(RemoteAction::Push)
    }

    fn log(&self, limit: usize) -> Result<Vec<CommitRecord>> {
        let _guard = self.enter("log".to_string());
        if let Some(epoch) = self.current_epoch() {
            return Ok(vec![CommitRecord::new(
                format!("{epoch:040x}"),
                "fake",
                format!("epoch {epoch}"),
                chrono::Utc::now(),
            )]);
        }
        let commits = self.recorder.commits.lock().map_err(|_| poisoned())?;
        Ok(commits.iter().take(limit).cloned().collect())
    }

    fn current_branch(&self) -> Result<String> {
        let _guard = self.enter("current_branch".to_string());
        match self.current_epoch() {
            Some(epoch) => Ok(format!("branch-{epoch}")),
            None => Ok("main".to_string()),
        }
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let _guard = self.enter("list_branches".to_string());
        Ok(vec!["main".to_string()])
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        let _guard = self.enter(format!("create_branch {name}"));
        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let _guard = self.enter(format!("checkout {name}"));
        Ok(())
    }
}

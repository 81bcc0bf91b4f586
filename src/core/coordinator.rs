//! The synchronization coordinator.
//!
//! [`SyncCoordinator`] owns one backend session and serializes every operation on it
//! through a single worker thread. Callers never block on the backend: each request
//! returns a [`Ticket`] that can be waited on or dropped. Filesystem changes reported
//! by the [`DirectoryWatcher`] and the completion of mutating operations both end in
//! the same refresh path, which swaps the published [`RepositoryState`] atomically and
//! notifies subscribers.
//!
//! # Public API
//! - [`SyncCoordinator`]: Session over one working tree
//! - [`Ticket`]: Completion handle for a queued request
//! - [`Outcome`]: What a completed request produced
//! - [`Phase`]: What the worker is doing right now
//!
//! # Ordering
//! Requests run FIFO. Refresh requests coalesce: while a refresh is queued and not yet
//! started, further refresh requests attach to it instead of queueing another one.

use crate::core::{
    backend::{PullOutcome, RemoteOptions, VersionControlBackend},
    change::ChangeEntry,
    config::SyncConfig,
    credentials::{CommitIdentity, Credentials},
    error::{Result, SyncError},
    events::{LogLine, Notification, Subscribers},
    git::GitRepo,
    handle::{Registration, RepositoryHandle},
    refresh,
    state::{short_id, CommitRecord, RepositoryState},
    watcher::{DirectoryWatcher, WatchEvent, WatchEventKind},
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Refreshing,
    RemoteSyncing,
    Mutating,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    Refreshed(Arc<RepositoryState>),
    /// Id of the new commit
    Committed(String),
    Pulled(PullOutcome),
    /// Commit log read straight from the backend, newest first
    History(Vec<CommitRecord>),
}

type Reply = Sender<Result<Outcome>>;

/// Completion handle for one request; dropping it does not cancel the request
pub struct Ticket {
    rx: Receiver<Result<Outcome>>,
}

impl Ticket {
    fn pending() -> (Reply, Ticket) {
        let (tx, rx) = mpsc::channel();
        (tx, Ticket { rx })
    }

    fn ready(result: Result<Outcome>) -> Ticket {
        let (tx, ticket) = Self::pending();
        let _ = tx.send(result);
        ticket
    }

    /// Block until the request has run
    pub fn wait(self) -> Result<Outcome> {
        self.rx.recv().unwrap_or(Err(SyncError::NoOpenRepository))
    }

    /// `None` when the request is still queued or running after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Outcome>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(SyncError::NoOpenRepository)),
        }
    }
}

enum Request {
    Stage(Vec<PathBuf>),
    Unstage(Vec<PathBuf>),
    StageAll,
    UnstageAll,
    Commit { message: String, push: bool },
    Fetch,
    Pull,
    Push,
    CreateBranch { name: String, checkout: bool },
    Checkout(String),
    History(usize),
    Refresh,
    Shutdown,
}

impl Request {
    fn phase(&self) -> Phase {
        match self {
            Request::Fetch | Request::Pull | Request::Push => Phase::RemoteSyncing,
            Request::Refresh | Request::History(_) => Phase::Refreshing,
            _ => Phase::Mutating,
        }
    }
}

struct Job {
    request: Request,
    reply: Option<Reply>,
}

/// A failed request together with the step that failed
struct Failure {
    action: &'static str,
    error: SyncError,
}

trait During<T> {
    fn during(self, action: &'static str) -> std::result::Result<T, Failure>;
}

impl<T> During<T> for Result<T> {
    fn during(self, action: &'static str) -> std::result::Result<T, Failure> {
        self.map_err(|error| Failure { action, error })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State reachable from the caller, the worker and the watcher thread
struct Shared {
    snapshot: RwLock<Arc<RepositoryState>>,
    phase: Mutex<Phase>,
    subscribers: Subscribers,
    queue: Mutex<Option<Sender<Job>>>,
    pending_refresh: Mutex<Option<Vec<Reply>>>,
}

impl Shared {
    fn snapshot(&self) -> Arc<RepositoryState> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish_state(&self, state: RepositoryState) -> Arc<RepositoryState> {
        let state = Arc::new(state);
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&state);
        self.subscribers.publish(Notification::State(Arc::clone(&state)));
        state
    }

    fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    fn replace_phase(&self, phase: Phase) -> Phase {
        std::mem::replace(&mut *lock(&self.phase), phase)
    }

    fn enqueue(&self, job: Job) -> std::result::Result<(), Job> {
        match lock(&self.queue).as_ref() {
            Some(queue) => queue.send(job).map_err(|failed| failed.0),
            None => Err(job),
        }
    }

    fn submit(&self, request: Request) -> Ticket {
        let (reply, ticket) = Ticket::pending();
        if let Err(job) = self.enqueue(Job {
            request,
            reply: Some(reply),
        }) {
            if let Some(reply) = job.reply {
                let _ = reply.send(Err(SyncError::NoOpenRepository));
            }
        }
        ticket
    }

    /// Queue a refresh unless one is already waiting to start
    fn request_refresh(&self, reply: Option<Reply>) {
        let mut pending = lock(&self.pending_refresh);
        if let Some(waiters) = pending.as_mut() {
            waiters.extend(reply);
            return;
        }

        *pending = Some(reply.into_iter().collect());
        let job = Job {
            request: Request::Refresh,
            reply: None,
        };
        if self.enqueue(job).is_err() {
            for waiter in pending.take().unwrap_or_default() {
                let _ = waiter.send(Err(SyncError::NoOpenRepository));
            }
        }
    }

    fn info(&self, message: impl Into<String>) {
        self.subscribers.log(LogLine::info(message));
    }

    fn error(&self, message: impl Into<String>) {
        self.subscribers.log(LogLine::error(message));
    }
}

fn on_watch_event(shared: &Shared, event: WatchEvent) {
    let message = match event.kind {
        WatchEventKind::Rescan => "File watcher lost events; rescanning".to_string(),
        kind => format!("File {kind}: {}", event.path.display()),
    };
    shared.info(message);
    shared.request_refresh(None);
}

/// Owns the backend; runs on the worker thread only
struct Worker {
    backend: Box<dyn VersionControlBackend>,
    credentials: Credentials,
    config: SyncConfig,
    author: CommitIdentity,
    shared: Arc<Shared>,
}

impl Worker {
    fn run(mut self, jobs: Receiver<Job>) {
        for job in jobs {
            if matches!(job.request, Request::Shutdown) {
                break;
            }
            self.handle(job);
        }

        for waiter in lock(&self.shared.pending_refresh).take().unwrap_or_default() {
            let _ = waiter.send(Err(SyncError::NoOpenRepository));
        }
        log::debug!("Worker for {} stopped", self.backend.workdir().display());
    }

    fn handle(&mut self, job: Job) {
        if let Request::Refresh = job.request {
            // Later refresh requests must queue a new cycle from here on
            let waiters = lock(&self.shared.pending_refresh).take().unwrap_or_default();
            let result = self.refresh();
            for waiter in waiters.into_iter().chain(job.reply) {
                let reply = match &result {
                    Ok(state) => Ok(Outcome::Refreshed(Arc::clone(state))),
                    Err(e) => Err(refresh_failure_for_waiter(e)),
                };
                let _ = waiter.send(reply);
            }
            return;
        }

        self.shared.replace_phase(job.request.phase());
        let result = self.execute(job.request);
        self.shared.replace_phase(Phase::Idle);

        let result = result.map_err(|failure| {
            self.shared
                .error(format!("Failed to {}: {}", failure.action, failure.error));
            failure.error
        });
        if let Some(reply) = job.reply {
            let _ = reply.send(result);
        }
    }

    /// Rebuild and publish the snapshot; the previous one stays on failure
    fn refresh(&mut self) -> Result<Arc<RepositoryState>> {
        let before = self.shared.replace_phase(Phase::Refreshing);
        let previous = self.shared.snapshot();
        let result = refresh::rebuild(
            self.backend.as_ref(),
            &previous,
            self.config.commit_log_limit,
        );
        self.shared.replace_phase(before);

        match result {
            Ok(state) => {
                log::debug!(
                    "Refreshed {} (generation {}, {} changes)",
                    state.workdir.display(),
                    state.generation,
                    state.changes.len()
                );
                Ok(self.shared.publish_state(state))
            }
            Err(e) => {
                self.shared.error(e.to_string());
                Err(e)
            }
        }
    }

    fn remote_options(&self) -> RemoteOptions<'_> {
        RemoteOptions {
            credentials: &self.credentials,
            remote_name: &self.config.remote_name,
            timeout: self.config.remote_timeout(),
            author: &self.author,
        }
    }

    fn after_success(&mut self, message: String) {
        self.shared.info(message);
        let _ = self.refresh();
    }

    fn execute(&mut self, request: Request) -> std::result::Result<Outcome, Failure> {
        match request {
            Request::Stage(paths) => {
                self.backend.stage(&paths).during("stage")?;
                self.after_success(format!("Staged {} file(s)", paths.len()));
                Ok(Outcome::Completed)
            }
            Request::Unstage(paths) => {
                self.backend.unstage(&paths).during("unstage")?;
                self.after_success(format!("Unstaged {} file(s)", paths.len()));
                Ok(Outcome::Completed)
            }
            Request::StageAll => {
                self.backend.stage_all().during("stage all")?;
                self.after_success("Staged all changes".to_string());
                Ok(Outcome::Completed)
            }
            Request::UnstageAll => {
                let staged = self
                    .backend
                    .status()
                    .during("unstage all")?
                    .staged_paths();
                self.backend.unstage(&staged).during("unstage all")?;
                self.after_success(format!("Unstaged {} file(s)", staged.len()));
                Ok(Outcome::Completed)
            }
            Request::Commit { message, push } => {
                let id = self
                    .backend
                    .commit(&message, &self.author)
                    .during("commit")?;
                let summary = message.lines().next().unwrap_or_default();
                self.after_success(format!("Committed {}: {}", short_id(&id), summary));

                if push {
                    self.shared.replace_phase(Phase::RemoteSyncing);
                    if let Err(source) = self.backend.push(&self.remote_options()) {
                        return Err(Failure {
                            action: "push",
                            error: SyncError::PushAfterCommit {
                                commit: id,
                                source: Box::new(source),
                            },
                        });
                    }
                    let branch = self.shared.snapshot().branch.clone();
                    self.after_success(format!("Pushed {branch}"));
                }
                Ok(Outcome::Committed(id))
            }
            Request::Fetch => {
                self.backend.fetch(&self.remote_options()).during("fetch")?;
                self.shared.info("Fetch complete");
                Ok(Outcome::Completed)
            }
            Request::Pull => {
                let outcome = self.backend.pull(&self.remote_options()).during("pull")?;
                let message = match &outcome {
                    PullOutcome::UpToDate => "Already up to date".to_string(),
                    PullOutcome::FastForward { to } => {
                        format!("Fast-forwarded to {}", short_id(to))
                    }
                    PullOutcome::Merged { commit } => {
                        format!("Merged remote changes as {}", short_id(commit))
                    }
                };
                self.after_success(message);
                Ok(Outcome::Pulled(outcome))
            }
            Request::Push => {
                self.backend.push(&self.remote_options()).during("push")?;
                let branch = self.shared.snapshot().branch.clone();
                self.after_success(format!("Pushed {branch}"));
                Ok(Outcome::Completed)
            }
            Request::CreateBranch { name, checkout } => {
                self.backend.create_branch(&name).during("create branch")?;
                if checkout {
                    self.backend.checkout(&name).during("checkout")?;
                    self.after_success(format!("Created and switched to branch {name}"));
                } else {
                    self.after_success(format!("Created branch {name}"));
                }
                Ok(Outcome::Completed)
            }
            Request::Checkout(name) => {
                self.backend.checkout(&name).during("checkout")?;
                self.after_success(format!("Switched to branch {name}"));
                Ok(Outcome::Completed)
            }
            Request::History(limit) => {
                let commits = self.backend.log(limit).during("read history")?;
                Ok(Outcome::History(commits))
            }
            Request::Refresh | Request::Shutdown => Ok(Outcome::Completed),
        }
    }
}

fn refresh_failure_for_waiter(error: &SyncError) -> SyncError {
    match error {
        SyncError::RefreshFailed { query, message } => SyncError::RefreshFailed {
            query: *query,
            message: message.clone(),
        },
        other => SyncError::RefreshFailed {
            query: "state",
            message: other.to_string(),
        },
    }
}

/// The worker thread and the channel that disconnects when it exits
struct WorkerThread {
    thread: JoinHandle<()>,
    exited: Mutex<Receiver<()>>,
}

/// One open working tree and everything that keeps its state current
pub struct SyncCoordinator {
    shared: Arc<Shared>,
    workdir: PathBuf,
    worker: Option<WorkerThread>,
    watcher: Option<DirectoryWatcher>,
    registration: Option<Registration>,
    shutdown_bound: Duration,
}

impl SyncCoordinator {
    /// Open the repository at `path` with the git2 backend
    pub fn open<P: AsRef<Path>>(
        path: P,
        credentials: Credentials,
        config: SyncConfig,
    ) -> Result<Self> {
        let backend = GitRepo::open(path)?;
        Self::with_backend(Box::new(backend), credentials, config)
    }

    /// Clone `url` into `path`, then open the result
    pub fn clone_repository<P: AsRef<Path>>(
        url: &str,
        path: P,
        credentials: Credentials,
        config: SyncConfig,
    ) -> Result<Self> {
        let backend = GitRepo::clone_from(url, path, &credentials, config.remote_timeout())?;
        Self::with_backend(Box::new(backend), credentials, config)
    }

    pub fn with_backend(
        backend: Box<dyn VersionControlBackend>,
        credentials: Credentials,
        config: SyncConfig,
    ) -> Result<Self> {
        let workdir = backend.workdir().to_path_buf();
        let registration = RepositoryHandle::register(&workdir)?;

        let (queue, jobs) = mpsc::channel();
        let shared = Arc::new(Shared {
            snapshot: RwLock::new(Arc::new(RepositoryState::empty(workdir.clone()))),
            phase: Mutex::new(Phase::Idle),
            subscribers: Subscribers::default(),
            queue: Mutex::new(Some(queue)),
            pending_refresh: Mutex::new(None),
        });

        let mut worker = Worker {
            backend,
            author: config.commit_identity(&credentials),
            credentials,
            config: config.clone(),
            shared: Arc::clone(&shared),
        };
        // The first snapshot is ready before open returns; without it there is no session
        worker.refresh()?;

        let (exit_signal, exited) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("git-sync-worker".to_string())
            .spawn(move || {
                let _exit_signal = exit_signal;
                worker.run(jobs);
            })?;

        let mut coordinator = SyncCoordinator {
            shared,
            workdir,
            worker: Some(WorkerThread {
                thread,
                exited: Mutex::new(exited),
            }),
            watcher: None,
            registration: Some(registration),
            shutdown_bound: config.shutdown_bound(),
        };
        if config.watch_enabled {
            coordinator.start_watcher(config.ignored_subpaths.clone());
        }

        if let Some(registration) = &coordinator.registration {
            log::info!("Opened {}", registration.handle());
        }
        Ok(coordinator)
    }

    fn start_watcher(&mut self, ignored: Vec<PathBuf>) {
        let mut watcher = DirectoryWatcher::new(ignored);
        let shared = Arc::clone(&self.shared);
        match watcher.start(&self.workdir, move |event| on_watch_event(&shared, event)) {
            Ok(()) => self.watcher = Some(watcher),
            Err(e) => self.shared.error(format!("Failed to watch {}: {e}", self.workdir.display())),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// `None` once the session has been closed
    pub fn handle(&self) -> Option<&RepositoryHandle> {
        self.registration.as_ref().map(Registration::handle)
    }

    pub fn is_open(&self) -> bool {
        self.registration.is_some()
    }

    pub fn snapshot(&self) -> Arc<RepositoryState> {
        self.shared.snapshot()
    }

    pub fn changes(&self) -> Vec<ChangeEntry> {
        self.snapshot().changes.clone()
    }

    /// Newest commits from the snapshot, which holds at most `commit_log_limit` of them;
    /// use [`SyncCoordinator::history`] to read further back
    pub fn commits(&self, limit: usize) -> Vec<CommitRecord> {
        self.snapshot().commits.iter().take(limit).cloned().collect()
    }

    /// Read up to `limit` commits from the backend, past the snapshot's cap
    pub fn history(&self, limit: usize) -> Ticket {
        self.shared.submit(Request::History(limit))
    }

    pub fn current_branch(&self) -> String {
        self.snapshot().branch.clone()
    }

    pub fn branches(&self) -> Vec<String> {
        self.snapshot().branches.clone()
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    pub fn watcher_active(&self) -> bool {
        self.watcher
            .as_ref()
            .is_some_and(DirectoryWatcher::is_running)
    }

    /// Receive snapshots and log lines from now on
    pub fn subscribe(&self) -> Receiver<Notification> {
        self.shared.subscribers.subscribe()
    }

    pub fn stage(&self, paths: &[PathBuf]) -> Ticket {
        self.shared.submit(Request::Stage(paths.to_vec()))
    }

    pub fn unstage(&self, paths: &[PathBuf]) -> Ticket {
        self.shared.submit(Request::Unstage(paths.to_vec()))
    }

    pub fn stage_all(&self) -> Ticket {
        self.shared.submit(Request::StageAll)
    }

    pub fn unstage_all(&self) -> Ticket {
        self.shared.submit(Request::UnstageAll)
    }

    pub fn commit(&self, message: &str) -> Ticket {
        self.submit_commit(message, false)
    }

    /// Commit, refresh, then push in one worker turn; the push only runs after a successful commit.
    /// A failed push resolves the ticket with [`SyncError::PushAfterCommit`], which carries the
    /// new commit id.
    pub fn commit_and_push(&self, message: &str) -> Ticket {
        self.submit_commit(message, true)
    }

    fn submit_commit(&self, message: &str, push: bool) -> Ticket {
        if message.trim().is_empty() {
            let error = SyncError::EmptyCommitMessage;
            self.shared.error(format!("Failed to commit: {error}"));
            return Ticket::ready(Err(error));
        }
        self.shared.submit(Request::Commit {
            message: message.to_string(),
            push,
        })
    }

    pub fn fetch(&self) -> Ticket {
        self.shared.submit(Request::Fetch)
    }

    pub fn pull(&self) -> Ticket {
        self.shared.submit(Request::Pull)
    }

    pub fn push(&self) -> Ticket {
        self.shared.submit(Request::Push)
    }

    pub fn create_branch(&self, name: &str, checkout: bool) -> Ticket {
        self.shared.submit(Request::CreateBranch {
            name: name.to_string(),
            checkout,
        })
    }

    pub fn checkout_branch(&self, name: &str) -> Ticket {
        self.shared.submit(Request::Checkout(name.to_string()))
    }

    pub fn refresh(&self) -> Ticket {
        let (reply, ticket) = Ticket::pending();
        self.shared.request_refresh(Some(reply));
        ticket
    }

    /// Stop watching, let queued requests finish, release the working tree.
    ///
    /// Waits at most the remote timeout plus `shutdown_grace_secs` for the worker; a
    /// worker still stuck in the backend after that is left to finish on its own.
    pub fn close(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }

        if let Some(queue) = lock(&self.shared.queue).take() {
            let _ = queue.send(Job {
                request: Request::Shutdown,
                reply: None,
            });
        }

        if let Some(worker) = self.worker.take() {
            match lock(&worker.exited).recv_timeout(self.shutdown_bound) {
                Err(RecvTimeoutError::Timeout) => log::warn!(
                    "Worker for {} still busy after {:?}; detaching it",
                    self.workdir.display(),
                    self.shutdown_bound
                ),
                _ => {
                    if worker.thread.join().is_err() {
                        log::error!("Worker thread for {} panicked", self.workdir.display());
                    }
                }
            }
        }

        if let Some(registration) = self.registration.take() {
            log::info!("Closed {}", registration.handle());
        }
        self.shared.replace_phase(Phase::Idle);
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.close();
    }
}

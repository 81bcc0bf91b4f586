//! Recursive directory watching built on per-directory `notify` registrations.
//!
//! [`DirectoryWatcher`] registers the root and every subdirectory non-recursively and
//! keeps the directory → [`WatchSubscription`] map on its own worker thread. New
//! directories are registered as they appear (their existing entries are reported as
//! created), removed directories drop their registrations, and the watcher stops by
//! itself once nothing is left to observe.
//!
//! Paths under an ignored subpath (the `.git` directory by default) are never
//! registered and never reported.

use crate::core::error::{Result, SyncError};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Created,
    Modified,
    Deleted,
    /// Events were lost; the whole tree must be re-read
    Rescan,
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WatchEventKind::Created => "created",
            WatchEventKind::Modified => "changed",
            WatchEventKind::Deleted => "deleted",
            WatchEventKind::Rescan => "rescan",
        };
        f.write_str(label)
    }
}

/// One filesystem change, relative to the watch root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Active registration for one directory
#[derive(Debug, Clone)]
pub struct WatchSubscription {
    pub since: Instant,
}

type EventCallback = Box<dyn FnMut(WatchEvent) + Send>;

enum WatchMessage {
    Fs(notify::Result<Event>),
    Shutdown,
}

struct WatchWorker {
    control: Sender<WatchMessage>,
    thread: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

pub struct DirectoryWatcher {
    ignored: Vec<PathBuf>,
    worker: Option<WatchWorker>,
}

impl DirectoryWatcher {
    /// `ignored` holds subpaths relative to the root (or absolute paths) that are never watched
    pub fn new(ignored: Vec<PathBuf>) -> Self {
        Self {
            ignored,
            worker: None,
        }
    }

    /// Begin observing `root`; a running watcher is stopped first
    pub fn start<F>(&mut self, root: &Path, on_event: F) -> Result<()>
    where
        F: FnMut(WatchEvent) + Send + 'static,
    {
        self.stop();

        if !root.is_dir() {
            return Err(SyncError::watch_root_missing(root));
        }
        let root = root.canonicalize()?;

        let (tx, rx) = mpsc::channel();
        let fs_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = fs_tx.send(WatchMessage::Fs(res));
        })
        .map_err(|e| SyncError::watch_init(&root, e))?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| SyncError::watch_init(&root, e))?;

        let mut tree = WatchTree {
            root: root.clone(),
            ignored: self.ignored.clone(),
            watcher,
            subscriptions: BTreeMap::new(),
            on_event: Box::new(on_event),
        };
        tree.subscriptions.insert(
            root.clone(),
            WatchSubscription {
                since: Instant::now(),
            },
        );
        tree.register_children(&root, false);
        log::debug!(
            "Watching {} ({} directories)",
            root.display(),
            tree.subscriptions.len()
        );

        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("git-sync-watcher".to_string())
            .spawn(move || {
                tree.run(rx);
                worker_running.store(false, Ordering::SeqCst);
            })?;

        self.worker = Some(WatchWorker {
            control: tx,
            thread,
            running,
        });
        Ok(())
    }

    /// Release every registration; no callback fires after this returns
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let _ = worker.control.send(WatchMessage::Shutdown);
        if worker.thread.thread().id() == thread::current().id() {
            // Called from inside the callback: the loop exits once it returns
            return;
        }
        if worker.thread.join().is_err() {
            log::warn!("Watcher thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| worker.running.load(Ordering::SeqCst))
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WatchTree {
    root: PathBuf,
    ignored: Vec<PathBuf>,
    watcher: RecommendedWatcher,
    subscriptions: BTreeMap<PathBuf, WatchSubscription>,
    on_event: EventCallback,
}

impl WatchTree {
    fn run(&mut self, rx: Receiver<WatchMessage>) {
        for message in rx {
            match message {
                WatchMessage::Shutdown => break,
                WatchMessage::Fs(Ok(event)) => self.handle(event),
                WatchMessage::Fs(Err(e)) => {
                    log::warn!("Watcher error under {}: {e}", self.root.display());
                    self.emit(WatchEvent::new(PathBuf::new(), WatchEventKind::Rescan));
                }
            }

            if self.subscriptions.is_empty() {
                log::info!("Watch root {} is gone; stopping", self.root.display());
                break;
            }
        }
        self.subscriptions.clear();
    }

    fn handle(&mut self, event: Event) {
        for (path, kind) in classify_event(&event) {
            if kind == WatchEventKind::Rescan {
                self.emit(WatchEvent::new(PathBuf::new(), kind));
                continue;
            }

            let Some(relative) = self.relative(&path) else {
                log::debug!("Ignoring event outside the root: {}", path.display());
                continue;
            };
            if is_ignored(&self.ignored, &self.root, &relative) {
                continue;
            }

            match kind {
                WatchEventKind::Created => {
                    self.emit(WatchEvent::new(relative, kind));
                    if path.is_dir() && !self.subscriptions.contains_key(&path) {
                        self.register(&path);
                        self.register_children(&path, true);
                    }
                }
                WatchEventKind::Deleted => {
                    self.emit(WatchEvent::new(relative, kind));
                    self.unregister_tree(&path);
                }
                _ => self.emit(WatchEvent::new(relative, kind)),
            }
        }
    }

    fn relative(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(Path::to_path_buf)
    }

    fn emit(&mut self, event: WatchEvent) {
        log::trace!("{} {}", event.kind, event.path.display());
        (self.on_event)(event);
    }

    fn register(&mut self, dir: &Path) -> bool {
        match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                self.subscriptions.insert(
                    dir.to_path_buf(),
                    WatchSubscription {
                        since: Instant::now(),
                    },
                );
                true
            }
            Err(e) => {
                log::warn!("Cannot watch {}: {e}", dir.display());
                false
            }
        }
    }

    /// Register every directory below `dir`; with `report` set, existing entries are
    /// emitted as created so files written before registration are not lost
    fn register_children(&mut self, dir: &Path, report: bool) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot list {}: {e}", dir.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(relative) = self.relative(&path) else {
                continue;
            };
            if is_ignored(&self.ignored, &self.root, &relative) {
                continue;
            }

            if report {
                self.emit(WatchEvent::new(relative, WatchEventKind::Created));
            }

            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && !self.subscriptions.contains_key(&path) && self.register(&path) {
                self.register_children(&path, report);
            }
        }
    }

    fn unregister_tree(&mut self, dir: &Path) {
        let gone: Vec<PathBuf> = self
            .subscriptions
            .keys()
            .filter(|key| key.starts_with(dir))
            .cloned()
            .collect();

        for key in gone {
            // The OS usually drops the registration with the directory already
            if let Err(e) = self.watcher.unwatch(&key) {
                log::trace!("unwatch {}: {e}", key.display());
            }
            self.subscriptions.remove(&key);
        }
    }
}

/// Map one notify event to (absolute path, kind) pairs
fn classify_event(event: &Event) -> Vec<(PathBuf, WatchEventKind)> {
    if event.need_rescan() {
        return vec![(PathBuf::new(), WatchEventKind::Rescan)];
    }

    let all = |kind: WatchEventKind| -> Vec<(PathBuf, WatchEventKind)> {
        event.paths.iter().map(|path| (path.clone(), kind)).collect()
    };

    match event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Create(_) => all(WatchEventKind::Created),
        EventKind::Remove(_) => all(WatchEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(WatchEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(WatchEventKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                changes.push((from.clone(), WatchEventKind::Deleted));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push((to.clone(), WatchEventKind::Created));
            }
            changes
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                let kind = if path.exists() {
                    WatchEventKind::Created
                } else {
                    WatchEventKind::Deleted
                };
                (path.clone(), kind)
            })
            .collect(),
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => {
            all(WatchEventKind::Modified)
        }
    }
}

fn is_ignored(ignored: &[PathBuf], root: &Path, relative: &Path) -> bool {
    ignored.iter().any(|entry| {
        if entry.is_absolute() {
            root.join(relative).starts_with(entry)
        } else {
            relative.starts_with(entry)
        }
    })
}

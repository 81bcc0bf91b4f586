//! Repository handles and the process-wide open registry.
//!
//! A working tree can be bound to at most one live session per process. The
//! [`Registration`] returned by [`RepositoryHandle::register`] holds the claim and
//! releases it when dropped.

use crate::core::error::{Result, SyncError};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    static OPEN: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    OPEN.get_or_init(|| Mutex::new(HashSet::new()))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryHandle {
    id: u64,
    workdir: PathBuf,
}

impl RepositoryHandle {
    /// Claim `workdir` for a new session
    pub(crate) fn register(workdir: &Path) -> Result<Registration> {
        let workdir = workdir
            .canonicalize()
            .unwrap_or_else(|_| workdir.to_path_buf());

        let mut open = registry()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !open.insert(workdir.clone()) {
            return Err(SyncError::repository_already_open(workdir));
        }

        let handle = RepositoryHandle {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            workdir,
        };
        log::debug!("Registered {handle}");
        Ok(Registration { handle })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl fmt::Display for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.workdir.display())
    }
}

pub(crate) struct Registration {
    handle: RepositoryHandle,
}

impl Registration {
    pub(crate) fn handle(&self) -> &RepositoryHandle {
        &self.handle
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        registry()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.handle.workdir);
        log::debug!("Released {}", self.handle);
    }
}

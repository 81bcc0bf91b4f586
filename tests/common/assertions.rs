//! Common assertion helpers for test output validation

#![allow(dead_code)]

use git_sync::{Notification, RepositoryState};
use predicates::prelude::*;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub fn not_a_repository() -> impl Predicate<str> {
    predicates::str::contains("Not a git repository")
}

pub fn has_branch_info() -> impl Predicate<str> {
    predicates::str::contains("On branch")
}

pub fn has_parent_info() -> impl Predicate<str> {
    predicates::str::contains("Parent")
}

pub fn has_file_index(index: u32) -> impl Predicate<str> {
    predicates::str::contains(format!("[{}]", index))
}

/// Wait for a published snapshot that satisfies `accept`
pub fn wait_for_state<F>(
    rx: &Receiver<Notification>,
    timeout: Duration,
    accept: F,
) -> Option<Arc<RepositoryState>>
where
    F: Fn(&RepositoryState) -> bool,
{
    let deadline = Instant::now() + timeout;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(Notification::State(state)) if accept(&state) => return Some(state),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

/// Wait for a log line containing `needle`
pub fn wait_for_log(rx: &Receiver<Notification>, timeout: Duration, needle: &str) -> bool {
    let deadline = Instant::now() + timeout;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(Notification::Log(line)) if line.message.contains(needle) => return true,
            Ok(_) => continue,
            Err(_) => return false,
        }
    }
    false
}

//! Consolidated test utilities for git-sync
//!
//! Real repositories are created with the `git` CLI in temporary directories;
//! coordinator ordering tests use the recording fake backend.

pub mod assertions;
pub mod fake_backend;
pub mod fixtures;
pub mod repository;

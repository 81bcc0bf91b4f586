//! Test data generation utilities and predefined scenarios

#![allow(dead_code)]

use super::repository::*;
use git_sync::core::error::Result;

/// Scenario: three committed files, two of them modified, plus two untracked files
pub fn create_multi_file_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;

    create_test_files(&repo.path, &["file1.txt", "file2.txt", "file3.txt"])?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Initial commit")?;

    create_file(&repo.path, "file1.txt", "changed\n")?;
    create_file(&repo.path, "file2.txt", "changed\n")?;
    create_test_files(&repo.path, &["file4.txt", "file5.txt"])?;

    Ok(repo)
}

/// Scenario: a working repository with one pushed commit and a bare `origin`
pub fn create_repo_with_remote() -> Result<(TestRepo, TestRepo)> {
    let remote = setup_bare_remote()?;
    let repo = setup_test_repo_with_initial_commit()?;

    let url = remote.path.to_string_lossy().to_string();
    git(&repo.path, &["remote", "add", "origin", &url])?;
    git(&repo.path, &["push", "-u", "origin", "main"])?;

    Ok((repo, remote))
}

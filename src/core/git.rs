//! Git repository operations backed by libgit2.
//!
//! This module provides [`GitRepo`], the `git2` implementation of
//! [`VersionControlBackend`]. It reads status into the seven refresh buckets, stages
//! and unstages paths, commits, manages local branches and performs fetch, pull and
//! push with the session credentials.
//!
//! # Public API
//! - [`GitRepo`]: One open repository session
//!
//! # Key Features
//! - **Status reading**: Convert git2 status flags to [`StatusBuckets`]
//! - **Index operations**: Stage (including deletions) and unstage, also before the first commit
//! - **Commits**: Detect an unchanged index as "nothing staged", finish pending merges
//! - **Remote sync**: Clone, fetch, fast-forward or merging pull, push with rejection reporting

use crate::core::{
    backend::{PullOutcome, RemoteOptions, VersionControlBackend},
    change::StatusBuckets,
    credentials::{CommitIdentity, Credentials},
    error::{RemoteAction, Result, SyncError},
    remote::RemoteSession,
    state::{short_id, CommitRecord},
};
use chrono::{DateTime, Utc};
use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    BranchType, Commit, ErrorCode, FetchOptions, IndexAddOption, ObjectType, PushOptions,
    Remote, Repository, Signature, Sort, StatusOptions,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
}

fn is_unborn(err: &git2::Error) -> bool {
    matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound)
}

fn commit_failed(source: git2::Error) -> SyncError {
    SyncError::CommitFailed { source }
}

impl GitRepo {
    /// Open the repository containing `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => SyncError::not_a_repository(path),
            _ => SyncError::repository_io(path, e),
        })?;
        Self::from_repository(repo, path)
    }

    /// Clone `url` into `path` using the session credentials
    pub fn clone_from<P: AsRef<Path>>(
        url: &str,
        path: P,
        credentials: &Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let session = RemoteSession::new(RemoteAction::Clone, credentials, timeout);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(session.callbacks());

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);

        log::info!("Cloning {} into {}", url, path.display());
        let repo = builder.clone(url, path).map_err(|e| match session.classify(e) {
            SyncError::Git(e) => SyncError::clone_io(path, e),
            other => other,
        })?;

        Self::from_repository(repo, path)
    }

    fn from_repository(repo: Repository, path: &Path) -> Result<Self> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| SyncError::not_a_repository(path))?
            .canonicalize()?;
        Ok(GitRepo { repo, workdir })
    }

    pub fn get_repository(&self) -> &Repository {
        &self.repo
    }

    /// Convert user supplied paths (absolute or workdir-relative) to pathspecs
    fn pathspecs(&self, paths: &[PathBuf]) -> Result<Vec<String>> {
        paths
            .iter()
            .map(|path| {
                let relative = if path.is_absolute() {
                    let absolute = path.canonicalize().unwrap_or_else(|_| path.clone());
                    absolute
                        .strip_prefix(&self.workdir)
                        .map(Path::to_path_buf)
                        .unwrap_or(absolute)
                } else {
                    path.clone()
                };
                relative
                    .to_str()
                    .map(|s| s.replace('\\', "/"))
                    .ok_or(SyncError::InvalidUtf8Path)
            })
            .collect()
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if is_unborn(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Name of the branch HEAD points at, also when that branch has no commits yet
    fn head_branch(&self, action: RemoteAction) -> Result<String> {
        let head = self.repo.find_reference("HEAD")?;
        head.symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(str::to_string)
            .ok_or(SyncError::DetachedHead { action })
    }

    /// Remote configured as the branch's upstream, else the session default
    fn remote_for(&self, branch: Option<&str>, default: &str) -> Result<Remote<'_>> {
        let name = branch
            .and_then(|branch| {
                self.repo
                    .branch_upstream_remote(&format!("refs/heads/{branch}"))
                    .ok()
            })
            .and_then(|buf| buf.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string());

        self.repo.find_remote(&name).map_err(|e| {
            log::debug!("Remote lookup for '{name}' failed: {e}");
            SyncError::no_remote(name)
        })
    }

    /// The index as currently on disk; other git tools may have written it since the last read
    fn fresh_index(&self) -> Result<git2::Index> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        Ok(index)
    }

    /// Commits named in `MERGE_HEAD`, one object id per line
    fn merge_heads(&self) -> Result<Vec<git2::Oid>> {
        let content = match std::fs::read_to_string(self.repo.path().join("MERGE_HEAD")) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| git2::Oid::from_str(line).map_err(SyncError::from))
            .collect()
    }

    fn current_branch_name(&self) -> Option<String> {
        self.head_branch(RemoteAction::Fetch).ok()
    }

    fn fast_forward(&self, branch: &str, target: git2::Oid) -> Result<()> {
        let refname = format!("refs/heads/{branch}");
        let object = self.repo.find_object(target, Some(ObjectType::Commit))?;
        self.repo
            .checkout_tree(&object, Some(CheckoutBuilder::new().safe()))?;

        match self.repo.find_reference(&refname) {
            Ok(mut reference) => {
                reference.set_target(target, "pull: fast-forward")?;
            }
            Err(_) => {
                self.repo
                    .reference(&refname, target, true, "pull: fast-forward")?;
            }
        }
        self.repo.set_head(&refname)?;
        Ok(())
    }

    fn merge_commit(
        &self,
        branch: &str,
        theirs: &git2::AnnotatedCommit<'_>,
        author: &CommitIdentity,
    ) -> Result<String> {
        self.repo
            .merge(&[theirs], None, Some(CheckoutBuilder::new().safe()))?;

        let mut index = self.repo.index()?;
        if index.has_conflicts() {
            let count = index.conflicts()?.count();
            return Err(SyncError::MergeConflicts { count });
        }

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let ours = self.repo.head()?.peel_to_commit()?;
        let their_commit = self.repo.find_commit(theirs.id())?;
        let signature = Signature::now(&author.name, &author.email)?;
        let message = format!("Merge {} into {}", short_id(&theirs.id().to_string()), branch);

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&ours, &their_commit],
        )?;
        self.repo.cleanup_state()?;
        Ok(oid.to_string())
    }
}

fn commit_record(commit: &Commit<'_>) -> CommitRecord {
    let author = commit.author();
    let timestamp = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();
    CommitRecord::new(
        commit.id().to_string(),
        author.name().unwrap_or("Unknown"),
        commit.summary().unwrap_or(""),
        timestamp,
    )
}

impl VersionControlBackend for GitRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn status(&self) -> Result<StatusBuckets> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut buckets = StatusBuckets::default();

        for entry in statuses.iter() {
            let path = entry.path().ok_or(SyncError::InvalidUtf8Path)?;
            buckets.insert_git2(PathBuf::from(path), entry.status());
        }

        Ok(buckets)
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let specs = self.pathspecs(paths)?;
        let mut index = self.fresh_index()?;
        index.add_all(specs.iter().map(String::as_str), IndexAddOption::DEFAULT, None)?;
        // add_all ignores deletions; update_all records them
        index.update_all(specs.iter().map(String::as_str), None)?;
        index.write()?;
        Ok(())
    }

    fn unstage(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let specs = self.pathspecs(paths)?;
        match self.head_commit()? {
            Some(head) => {
                self.repo
                    .reset_default(Some(head.as_object()), specs.iter().map(String::as_str))?;
            }
            None => {
                let mut index = self.fresh_index()?;
                index.remove_all(specs.iter().map(String::as_str), None)?;
                index.write()?;
            }
        }
        Ok(())
    }

    fn stage_all(&self) -> Result<()> {
        let mut index = self.fresh_index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str, author: &CommitIdentity) -> Result<String> {
        let mut index = self.fresh_index()?;
        let tree_id = index.write_tree().map_err(commit_failed)?;
        let parent = self.head_commit()?;
        let merging = self.repo.state() == git2::RepositoryState::Merge;

        if !merging {
            let unchanged = match &parent {
                Some(parent) => parent.tree_id() == tree_id,
                None => index.is_empty(),
            };
            if unchanged {
                return Err(SyncError::NoStagedChanges);
            }
        }

        let mut parents: Vec<Commit<'_>> = parent.into_iter().collect();
        if merging {
            for oid in self.merge_heads()? {
                parents.push(self.repo.find_commit(oid)?);
            }
        }
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();

        let tree = self.repo.find_tree(tree_id)?;
        let signature = Signature::now(&author.name, &author.email).map_err(commit_failed)?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)
            .map_err(commit_failed)?;

        if merging {
            self.repo.cleanup_state()?;
        }

        log::debug!("Created commit {oid}");
        Ok(oid.to_string())
    }

    fn fetch(&self, remote: &RemoteOptions<'_>) -> Result<()> {
        let branch = self.current_branch_name();
        let mut git_remote = self.remote_for(branch.as_deref(), remote.remote_name)?;
        let session = RemoteSession::new(RemoteAction::Fetch, remote.credentials, remote.timeout);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(session.callbacks());

        git_remote
            .fetch(&[] as &[&str], Some(&mut fetch_options), None)
            .map_err(|e| session.classify(e))?;
        Ok(())
    }

    fn pull(&self, remote: &RemoteOptions<'_>) -> Result<PullOutcome> {
        let branch = self.current_branch_name();
        let mut git_remote = self.remote_for(branch.as_deref(), remote.remote_name)?;
        let branch = self.head_branch(RemoteAction::Pull)?;
        let session = RemoteSession::new(RemoteAction::Pull, remote.credentials, remote.timeout);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(session.callbacks());

        git_remote
            .fetch(&[branch.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| session.classify(e))?;

        let fetch_head = self.repo.find_reference("FETCH_HEAD")?;
        let theirs = self.repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = self.repo.merge_analysis(&[&theirs])?;

        if analysis.is_up_to_date() {
            Ok(PullOutcome::UpToDate)
        } else if analysis.is_fast_forward() || analysis.is_unborn() {
            self.fast_forward(&branch, theirs.id())?;
            Ok(PullOutcome::FastForward {
                to: theirs.id().to_string(),
            })
        } else {
            let commit = self.merge_commit(&branch, &theirs, remote.author)?;
            Ok(PullOutcome::Merged { commit })
        }
    }

    fn push(&self, remote: &RemoteOptions<'_>) -> Result<()> {
        let branch = self.current_branch_name();
        let mut git_remote = self.remote_for(branch.as_deref(), remote.remote_name)?;
        let remote_name = git_remote.name().unwrap_or(remote.remote_name).to_string();
        let branch = self.head_branch(RemoteAction::Push)?;
        let session = RemoteSession::new(RemoteAction::Push, remote.credentials, remote.timeout);

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(session.callbacks());

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        git_remote
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| session.classify(e))?;
        session.check_rejection()?;

        // First push of a branch: track the remote branch so later pulls know where to go
        if let Ok(mut local) = self.repo.find_branch(&branch, BranchType::Local) {
            if local.upstream().is_err() {
                let upstream = format!("{remote_name}/{branch}");
                if let Err(e) = local.set_upstream(Some(upstream.as_str())) {
                    log::debug!("Could not set upstream for '{branch}': {e}");
                }
            }
        }
        Ok(())
    }

    fn log(&self, limit: usize) -> Result<Vec<CommitRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // An unborn branch has no history; revwalk would report a missing reference
        let Some(head) = self.head_commit()? else {
            return Ok(Vec::new());
        };

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(head.id())?;
        revwalk.set_sorting(Sort::TIME)?;

        let mut commits = Vec::with_capacity(limit.min(256));
        for oid in revwalk.take(limit) {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(commit_record(&commit));
        }
        Ok(commits)
    }

    fn current_branch(&self) -> Result<String> {
        match self.repo.head() {
            Ok(head) => {
                if head.is_branch() {
                    Ok(head.shorthand().unwrap_or("HEAD").to_string())
                } else {
                    match head.target() {
                        Some(oid) => Ok(format!("detached at {}", short_id(&oid.to_string()))),
                        None => Ok("HEAD".to_string()),
                    }
                }
            }
            Err(e) if is_unborn(&e) => Ok(self
                .head_branch(RemoteAction::Fetch)
                .unwrap_or_else(|_| "HEAD".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        let head = self.repo.head()?.peel_to_commit()?;
        self.repo.branch(name, &head, false)?;
        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{name}");
        let reference = self.repo.find_reference(&refname)?;
        let target = reference.peel(ObjectType::Commit)?;
        self.repo
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
        self.repo.set_head(&refname)?;
        Ok(())
    }
}

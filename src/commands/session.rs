use crate::core::{
    config::SyncConfig, coordinator::SyncCoordinator, credentials::Credentials, error::Result,
};
use std::env;
use std::path::{Path, PathBuf};

const TOKEN_VAR: &str = "GIT_SYNC_TOKEN";
const PASSWORD_VAR: &str = "GIT_SYNC_PASSWORD";

/// Global options shared by every command
#[derive(Debug, Clone, Default)]
pub struct SessionArgs {
    pub repo: Option<PathBuf>,
    pub username: Option<String>,
}

impl SessionArgs {
    pub fn repo_path(&self) -> Result<PathBuf> {
        match &self.repo {
            Some(path) => Ok(path.clone()),
            None => Ok(env::current_dir()?),
        }
    }

    pub fn username(&self) -> String {
        self.username
            .clone()
            .or_else(|| env::var("USER").ok())
            .or_else(|| env::var("USERNAME").ok())
            .unwrap_or_else(|| "git-sync".to_string())
    }

    /// Token wins over password; without either, remote calls go out anonymously
    pub fn credentials(&self) -> Credentials {
        let username = self.username();
        if let Some(token) = non_empty_var(TOKEN_VAR) {
            Credentials::personal_access_token(username, token)
        } else if let Some(password) = non_empty_var(PASSWORD_VAR) {
            Credentials::username_password(username, password)
        } else {
            Credentials::anonymous(username)
        }
    }

    /// Open the repository; one-shot commands run without the file watcher
    pub fn open(&self, watch: bool) -> Result<SyncCoordinator> {
        let mut config = SyncConfig::load_or_default()?;
        config.watch_enabled = watch;
        SyncCoordinator::open(self.repo_path()?, self.credentials(), config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Make command-line paths absolute so they resolve against the caller's directory
pub fn absolute_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let cwd = env::current_dir()?;
    Ok(paths.iter().map(|path| absolute_from(&cwd, path)).collect())
}

fn absolute_from(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

use crate::core::credentials::{CommitIdentity, Credentials};
use crate::core::dirs::get_config_directory;
use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// How many commits each refresh reads from the log
    pub commit_log_limit: usize,
    /// Remote used for fetch/pull/push when the branch has no upstream
    pub remote_name: String,
    /// Upper bound for a single remote operation; `None` waits forever
    pub remote_timeout_secs: Option<u64>,
    /// Domain of the synthesized author email
    pub author_email_domain: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    /// Subpaths of the working tree the watcher never reports
    pub ignored_subpaths: Vec<PathBuf>,
    pub watch_enabled: bool,
    /// How long `close` waits for a busy worker beyond the remote timeout
    pub shutdown_grace_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            commit_log_limit: 50,
            remote_name: "origin".to_string(),
            remote_timeout_secs: Some(120),
            author_email_domain: "git.local".to_string(),
            author_name: None,
            author_email: None,
            ignored_subpaths: vec![PathBuf::from(".git")],
            watch_enabled: true,
            shutdown_grace_secs: 10,
        }
    }
}

impl SyncConfig {
    /// Load the user configuration, falling back to defaults when none exists
    pub fn load_or_default() -> Result<Self> {
        let config_file = get_config_directory()?.join(CONFIG_FILE);
        Self::load_from(&config_file)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = get_config_directory()?;
        std::fs::create_dir_all(&config_dir)?;
        self.save_to(&config_dir.join(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote_timeout_secs.map(Duration::from_secs)
    }

    /// Upper bound for waiting on the worker when a session closes
    pub fn shutdown_bound(&self) -> Duration {
        self.remote_timeout().unwrap_or_default() + Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Author for new commits: configured overrides win over the session identity
    pub fn commit_identity(&self, credentials: &Credentials) -> CommitIdentity {
        let derived = credentials.commit_identity(&self.author_email_domain);
        CommitIdentity {
            name: self.author_name.clone().unwrap_or(derived.name),
            email: self.author_email.clone().unwrap_or(derived.email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.commit_log_limit, 50);
        assert_eq!(config.remote_name, "origin");
        assert_eq!(config.remote_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.ignored_subpaths, vec![PathBuf::from(".git")]);
        assert!(config.watch_enabled);
        assert_eq!(config.shutdown_bound(), Duration::from_secs(130));
    }

    #[test]
    fn test_missing_file_yields_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = SyncConfig::load_from(&temp_dir.path().join("absent.json"))?;
        assert_eq!(config, SyncConfig::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{ "commit_log_limit": 10, "remote_timeout_secs": null }"#)?;

        let config = SyncConfig::load_from(&path)?;
        assert_eq!(config.commit_log_limit, 10);
        assert_eq!(config.remote_timeout(), None);
        assert_eq!(config.remote_name, "origin");
        Ok(())
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        let config = SyncConfig {
            remote_name: "upstream".to_string(),
            ..SyncConfig::default()
        };
        config.save_to(&path)?;
        assert_eq!(SyncConfig::load_from(&path)?.remote_name, "upstream");
        Ok(())
    }

    #[test]
    fn test_commit_identity_overrides() {
        let creds = Credentials::username_password("carol", "pw");
        let mut config = SyncConfig::default();
        assert_eq!(config.commit_identity(&creds).email, "carol@git.local");

        config.author_email = Some("carol@example.com".to_string());
        let identity = config.commit_identity(&creds);
        assert_eq!(identity.name, "carol");
        assert_eq!(identity.email, "carol@example.com");
    }
}

use crate::core::error::Result;
use std::io;
use std::path::PathBuf;

const APP_DIR: &str = "git-sync";

/// Per-user configuration directory for git-sync
///
/// Unix-likes honour `XDG_CONFIG_HOME` and fall back to `~/.config`; macOS uses
/// `~/Library/Application Support`; everything else asks `dirs`.
pub fn get_config_directory() -> Result<PathBuf> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var_os("XDG_CONFIG_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config"))),
        "macos" => dirs::home_dir().map(|home| home.join("Library/Application Support")),
        _ => dirs::config_dir(),
    };

    let base = base.ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "no home directory for the configuration")
    })?;
    Ok(base.join(APP_DIR))
}

use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

const CACHE_DIR_NAME: &str = "patchkit-cache";

/// Base patchkit config directory (~/.config/patchkit/, %APPDATA%\patchkit on Windows)
pub fn patchkit() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("patchkit"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("patchkit"))
    }
}

/// Global patchkit.json config file path
pub fn patchkit_json() -> Result<PathBuf> {
    Ok(patchkit()?.join("patchkit.json"))
}

/// Default content cache directory, under the platform temp dir
pub fn default_cache_dir() -> PathBuf {
    env::temp_dir().join(CACHE_DIR_NAME)
}

/// Directory holding per-run SSH control sockets
pub fn ssh_control_dir() -> PathBuf {
    env::temp_dir().join("patchkit-ssh")
}

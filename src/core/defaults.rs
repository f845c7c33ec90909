use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::paths;
use crate::repo::{RepoIdentity, RepoList};

/// Root configuration structure for patchkit.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatchkitConfig {
    /// Repositories offering remote sources; first is the default.
    /// Empty means: use the bundled list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepoIdentity>,

    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via patchkit.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_github")]
    pub github: GithubConfig,

    #[serde(default = "default_ssh")]
    pub ssh: SshConfig,

    #[serde(default = "default_cache")]
    pub cache: CacheConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            github: default_github(),
            ssh: default_ssh(),
            cache: default_cache(),
        }
    }
}

/// Endpoints and HTTP behavior for the hosting repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_raw_base")]
    pub raw_base: String,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,

    /// Accept unknown host keys (devices are routinely re-flashed).
    #[serde(default = "default_accept_new_host_keys")]
    pub accept_new_host_keys: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Override for the content cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl CacheConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(shellexpand::tilde(dir).as_ref()),
            _ => paths::default_cache_dir(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_github() -> GithubConfig {
    GithubConfig {
        api_base: default_api_base(),
        raw_base: default_raw_base(),
        timeout_secs: default_http_timeout_secs(),
        user_agent: default_user_agent(),
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("patchkit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_ssh() -> SshConfig {
    SshConfig {
        port: default_ssh_port(),
        connect_timeout_secs: default_connect_timeout_secs(),
        identity_file: None,
        accept_new_host_keys: default_accept_new_host_keys(),
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_accept_new_host_keys() -> bool {
    true
}

fn default_cache() -> CacheConfig {
    CacheConfig::default()
}

impl PatchkitConfig {
    pub fn repo_list(&self) -> RepoList {
        RepoList::resolve(&self.repositories)
    }
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load the full patchkit.json config, falling back to defaults on any error.
pub fn load_config() -> PatchkitConfig {
    match load_config_from_file() {
        Ok(config) => config,
        Err(err) => {
            if config_exists() {
                tracing::warn!(error = %err, "ignoring unreadable patchkit.json");
            }
            PatchkitConfig::default()
        }
    }
}

/// Attempt to load config from patchkit.json file.
fn load_config_from_file() -> crate::Result<PatchkitConfig> {
    let path = paths::patchkit_json()?;

    if !path.exists() {
        return Err(crate::Error::other("patchkit.json not found"));
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    parse_config(&content, &path.display().to_string())
}

fn parse_config(content: &str, path: &str) -> crate::Result<PatchkitConfig> {
    serde_json::from_str(content).map_err(|e| crate::Error::config_invalid_json(path, e))
}

/// Check if patchkit.json file exists
pub fn config_exists() -> bool {
    paths::patchkit_json().map(|p| p.exists()).unwrap_or(false)
}

/// Get the path to patchkit.json (for display purposes)
pub fn config_path() -> crate::Result<String> {
    Ok(paths::patchkit_json()?.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_builtin_defaults() {
        let config = parse_config("{}", "patchkit.json").unwrap();
        assert!(config.repositories.is_empty());
        assert_eq!(config.defaults.ssh.port, 22);
        assert_eq!(config.defaults.github.timeout_secs, 30);
        assert_eq!(config.defaults.github.api_base, "https://api.github.com");
        assert!(config.defaults.github.user_agent.starts_with("patchkit/"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"{
                "repositories": [{"owner": "acme", "name": "fixes"}],
                "defaults": {"ssh": {"port": 2222}, "cache": {"dir": "/var/cache/pk"}}
            }"#,
            "patchkit.json",
        )
        .unwrap();
        assert_eq!(config.defaults.ssh.port, 2222);
        assert_eq!(config.defaults.ssh.connect_timeout_secs, 10);
        assert_eq!(
            config.defaults.cache.resolved_dir(),
            PathBuf::from("/var/cache/pk")
        );
        assert_eq!(
            config.repo_list().default_repo(),
            RepoIdentity::new("acme", "fixes")
        );
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = parse_config("{ nope", "patchkit.json").unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ConfigInvalidJson);
    }

    #[test]
    fn cache_dir_defaults_to_temp() {
        assert_eq!(
            CacheConfig::default().resolved_dir(),
            paths::default_cache_dir()
        );
    }
}

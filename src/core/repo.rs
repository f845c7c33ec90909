//! Repository identities and the configured repository list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bundle;
use crate::error::{Error, Result};

pub const DEFAULT_OWNER: &str = "pijalu";
pub const DEFAULT_NAME: &str = "printer-patcher";

const BUNDLED_REPO_FILE: &str = "repo.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
}

impl RepoIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn default_repo() -> Self {
        Self::new(DEFAULT_OWNER, DEFAULT_NAME)
    }

    /// Parse `owner/name`.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        match value.split_once('/') {
            Some((owner, name))
                if !owner.trim().is_empty()
                    && !name.trim().is_empty()
                    && !name.contains('/') =>
            {
                Ok(Self::new(owner.trim(), name.trim()))
            }
            _ => Err(Error::validation_invalid_argument(
                "repository",
                format!("Expected 'owner/name', got '{}'", value),
                Some(value.to_string()),
                None,
            )),
        }
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoList {
    #[serde(default)]
    pub repositories: Vec<RepoIdentity>,
}

impl RepoList {
    /// The list to use given the user-configured repositories: configured
    /// entries win, then the bundled `repo.yaml`, then the hard-coded default.
    pub fn resolve(configured: &[RepoIdentity]) -> Self {
        if !configured.is_empty() {
            return Self {
                repositories: configured.to_vec(),
            };
        }

        let mut list = bundled().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "bundled repository list unreadable, using default");
            Self::default()
        });
        if list.repositories.is_empty() {
            list.repositories.push(RepoIdentity::default_repo());
        }
        list
    }

    /// First entry; the default repository for bare revision selectors.
    pub fn default_repo(&self) -> RepoIdentity {
        self.repositories
            .first()
            .cloned()
            .unwrap_or_else(RepoIdentity::default_repo)
    }
}

fn bundled() -> Result<RepoList> {
    let Some(data) = bundle::read(BUNDLED_REPO_FILE) else {
        return Ok(RepoList::default());
    };
    let content = String::from_utf8_lossy(&data);
    serde_yml::from_str(&content).map_err(|e| {
        Error::config_invalid_value(BUNDLED_REPO_FILE, None, format!("invalid YAML: {}", e))
    })
}

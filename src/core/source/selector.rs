use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::repo::RepoIdentity;

/// Identifier of the bundled source.
pub const LOCAL_SOURCE: &str = "local";

/// Which source to load actions from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSelector {
    Local,
    Remote { repo: RepoIdentity, revision: String },
}

impl SourceSelector {
    /// Accepts `local`, `owner/name@rev`, `[owner/name] rev` or a bare `rev`
    /// (resolved against `default_repo`).
    pub fn parse(input: &str, default_repo: &RepoIdentity) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid(input, "Source must not be empty"));
        }
        if input == LOCAL_SOURCE {
            return Ok(Self::Local);
        }

        if let Some(rest) = input.strip_prefix('[') {
            let (repo, revision) = rest
                .split_once(']')
                .ok_or_else(|| invalid(input, "Missing ']' after repository"))?;
            return Self::remote(input, RepoIdentity::parse(repo)?, revision);
        }

        if let Some((repo, revision)) = input.rsplit_once('@') {
            return Self::remote(input, RepoIdentity::parse(repo)?, revision);
        }

        if input.contains(char::is_whitespace) {
            return Err(invalid(input, "Revision must not contain whitespace"));
        }

        Ok(Self::Remote {
            repo: default_repo.clone(),
            revision: input.to_string(),
        })
    }

    fn remote(input: &str, repo: RepoIdentity, revision: &str) -> Result<Self> {
        let revision = revision.trim();
        if revision.is_empty() {
            return Err(invalid(input, "Missing revision"));
        }
        if revision == LOCAL_SOURCE {
            return Ok(Self::Local);
        }
        Ok(Self::Remote {
            repo,
            revision: revision.to_string(),
        })
    }

    /// `local` or `owner/name@revision`.
    pub fn identifier(&self) -> String {
        match self {
            Self::Local => LOCAL_SOURCE.to_string(),
            Self::Remote { repo, revision } => format!("{}@{}", repo, revision),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

fn invalid(input: &str, problem: &str) -> Error {
    Error::validation_invalid_argument(
        "source",
        problem,
        Some(input.to_string()),
        None,
    )
    .with_hint("Use 'local', 'owner/name@revision' or a bare revision")
}

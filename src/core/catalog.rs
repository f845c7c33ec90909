//! Procedure catalog: credentials plus an ordered list of actions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Suffix that marks a step's `script` as a reference to a script file.
pub const SCRIPT_SUFFIX: &str = ".sh";

/// Well-known path of the catalog inside a source.
pub const CATALOG_FILE: &str = "actions.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl Step {
    /// True when `script` names a script file to resolve through the source.
    pub fn is_script_ref(&self) -> bool {
        is_script_ref(&self.script)
    }

    pub fn expected_pattern(&self) -> Option<&str> {
        self.expected.as_deref().filter(|e| !e.trim().is_empty())
    }
}

pub fn is_script_ref(script: &str) -> bool {
    script.ends_with(SCRIPT_SUFFIX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Action {
    /// Distinct script references, in first-use order.
    pub fn script_refs(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        for step in self.steps.iter().filter(|s| s.is_script_ref()) {
            if !refs.contains(&step.script.as_str()) {
                refs.push(&step.script);
            }
        }
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Catalog {
    /// Parse catalog YAML. `source` is only used for error reporting.
    pub fn from_yaml(content: &str, source: &str) -> Result<Self> {
        serde_yml::from_str(content).map_err(|e| Error::catalog_parse(source, e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8], source: &str) -> Result<Self> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| Error::catalog_parse(source, format!("invalid UTF-8: {}", e)))?;
        Self::from_yaml(content, source)
    }

    pub fn action_titles(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.title.clone()).collect()
    }

    /// Find an action by exact title.
    pub fn find_action(&self, title: &str, source: &str) -> Result<&Action> {
        self.actions
            .iter()
            .find(|a| a.title == title)
            .ok_or_else(|| Error::action_not_found(title, source, self.action_titles()))
    }
}

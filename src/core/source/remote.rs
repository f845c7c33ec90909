use crate::catalog::Catalog;
use crate::error::Result;
use crate::github::RepositoryClient;

use super::{ActionProvider, SourceSelector};

/// Actions and scripts from a repository at one revision.
#[derive(Clone)]
pub struct RemoteSource {
    client: RepositoryClient,
    revision: String,
}

impl RemoteSource {
    pub fn new(client: RepositoryClient, revision: impl Into<String>) -> Self {
        Self {
            client,
            revision: revision.into(),
        }
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl ActionProvider for RemoteSource {
    fn source_name(&self) -> String {
        SourceSelector::Remote {
            repo: self.client.repo().clone(),
            revision: self.revision.clone(),
        }
        .identifier()
    }

    fn load_catalog(&self) -> Result<Catalog> {
        let data = self.client.fetch_config(&self.revision)?;
        Catalog::from_bytes(&data, &self.source_name())
    }

    fn load_step(&self, script_ref: &str) -> Result<String> {
        let data = self.client.fetch_script(&self.revision, script_ref)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

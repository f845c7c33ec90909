//! Interchangeable origins of action catalogs and step scripts.

mod local;
mod remote;
mod selector;

pub use local::LocalSource;
pub use remote::RemoteSource;
pub use selector::{SourceSelector, LOCAL_SOURCE};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::github::ClientFactory;

/// Where catalogs and scripts come from.
pub trait ActionProvider: Send + Sync {
    /// `local` or `owner/name@revision`.
    fn source_name(&self) -> String;

    fn load_catalog(&self) -> Result<Catalog>;

    /// Contents of the script referenced by a step.
    fn load_step(&self, script_ref: &str) -> Result<String>;
}

#[derive(Clone)]
pub enum ActionSource {
    Local(LocalSource),
    Remote(RemoteSource),
}

impl ActionSource {
    pub fn from_selector(selector: &SourceSelector, clients: &ClientFactory) -> Self {
        match selector {
            SourceSelector::Local => Self::Local(LocalSource),
            SourceSelector::Remote { repo, revision } => {
                Self::Remote(RemoteSource::new(clients.client(repo), revision.clone()))
            }
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl ActionProvider for ActionSource {
    fn source_name(&self) -> String {
        match self {
            Self::Local(s) => s.source_name(),
            Self::Remote(s) => s.source_name(),
        }
    }

    fn load_catalog(&self) -> Result<Catalog> {
        match self {
            Self::Local(s) => s.load_catalog(),
            Self::Remote(s) => s.load_catalog(),
        }
    }

    fn load_step(&self, script_ref: &str) -> Result<String> {
        match self {
            Self::Local(s) => s.load_step(script_ref),
            Self::Remote(s) => s.load_step(script_ref),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentCache;
    use crate::error::ErrorCode;
    use crate::github::{Endpoints, HttpFetch, HttpResponse};
    use crate::repo::RepoIdentity;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct StaticHttp(HashMap<String, String>);

    impl HttpFetch for StaticHttp {
        fn get(&self, url: &str) -> Result<HttpResponse> {
            Ok(match self.0.get(url) {
                Some(body) => HttpResponse {
                    status: 200,
                    body: body.clone().into_bytes(),
                },
                None => HttpResponse {
                    status: 404,
                    body: Vec::new(),
                },
            })
        }
    }

    const REMOTE_CATALOG: &str = r#"
username: admin
password: hunter2
actions:
  - title: Remote only
    description: Present only upstream
    steps:
      - title: Patch
        script: patch.sh
        expected: done
"#;

    fn factory(dir: &std::path::Path) -> ClientFactory {
        let mut files = HashMap::new();
        files.insert(
            "https://raw.test/acme/fixes/v1/config/actions.yaml".to_string(),
            REMOTE_CATALOG.to_string(),
        );
        files.insert(
            "https://raw.test/acme/fixes/v1/config/patch.sh".to_string(),
            "echo done\n".to_string(),
        );
        files.insert(
            "https://raw.test/acme/fixes/broken/config/actions.yaml".to_string(),
            "actions: [unterminated".to_string(),
        );
        ClientFactory::new(
            Endpoints::new("https://api.test", "https://raw.test"),
            Arc::new(StaticHttp(files)),
            Arc::new(ContentCache::open(dir).unwrap()),
        )
    }

    fn remote(rev: &str) -> SourceSelector {
        SourceSelector::Remote {
            repo: RepoIdentity::new("acme", "fixes"),
            revision: rev.to_string(),
        }
    }

    #[test]
    fn remote_source_loads_catalog_and_scripts() {
        let dir = tempdir().unwrap();
        let source = ActionSource::from_selector(&remote("v1"), &factory(dir.path()));
        assert_eq!(source.source_name(), "acme/fixes@v1");

        let catalog = source.load_catalog().unwrap();
        assert_eq!(catalog.username, "admin");
        assert_eq!(catalog.action_titles(), vec!["Remote only"]);
        assert_eq!(source.load_step("config/patch.sh").unwrap(), "echo done\n");
    }

    #[test]
    fn malformed_remote_catalog_is_parse_error() {
        let dir = tempdir().unwrap();
        let source = ActionSource::from_selector(&remote("broken"), &factory(dir.path()));
        let err = source.load_catalog().unwrap_err();
        assert_eq!(err.code, ErrorCode::CatalogParseError);
        assert_eq!(err.details["source"], "acme/fixes@broken");
    }

    #[test]
    fn switching_sources_leaves_loaded_catalog_untouched() {
        let dir = tempdir().unwrap();
        let clients = factory(dir.path());

        let local = ActionSource::from_selector(&SourceSelector::Local, &clients);
        let local_catalog = local.load_catalog().unwrap();
        let snapshot = local_catalog.clone();

        let remote = ActionSource::from_selector(&remote("v1"), &clients);
        let remote_catalog = remote.load_catalog().unwrap();

        assert_eq!(local_catalog, snapshot);
        assert_ne!(local_catalog, remote_catalog);
        assert!(local.is_local());
        assert!(!remote.is_local());
    }
}

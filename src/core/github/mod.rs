//! Remote repository access: revision discovery and raw file downloads.

mod client;
mod http;

pub use client::{
    revisions_from, script_path, Branch, Endpoints, Release, RepositoryClient, MAIN_BRANCH,
    SCRIPT_ROOT,
};
pub use http::{HttpFetch, HttpResponse, ReqwestFetch};

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{ContentCache, SourceListCache};
use crate::defaults::GithubConfig;
use crate::error::Result;
use crate::repo::RepoIdentity;
use crate::source::{SourceSelector, LOCAL_SOURCE};

/// Shared transport, cache and endpoints for building per-repository clients.
#[derive(Clone)]
pub struct ClientFactory {
    endpoints: Endpoints,
    http: Arc<dyn HttpFetch>,
    cache: Arc<ContentCache>,
}

impl ClientFactory {
    pub fn new(endpoints: Endpoints, http: Arc<dyn HttpFetch>, cache: Arc<ContentCache>) -> Self {
        Self {
            endpoints,
            http,
            cache,
        }
    }

    pub fn from_config(config: &GithubConfig, cache: Arc<ContentCache>) -> Result<Self> {
        Ok(Self::new(
            Endpoints::from(config),
            Arc::new(ReqwestFetch::new(config)?),
            cache,
        ))
    }

    pub fn client(&self, repo: &RepoIdentity) -> RepositoryClient {
        RepositoryClient::new(
            repo.clone(),
            self.endpoints.clone(),
            self.http.clone(),
            self.cache.clone(),
        )
    }

    pub fn clients(&self, repos: &[RepoIdentity]) -> Vec<RepositoryClient> {
        repos.iter().map(|r| self.client(r)).collect()
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoListingError {
    pub repository: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceListing {
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RepoListingError>,
    pub cached: bool,
}

fn memo_key(clients: &[RepositoryClient]) -> String {
    clients
        .iter()
        .map(|c| c.repo().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn durable_key(key: &str) -> String {
    format!("patchkit:sources/{}", key)
}

fn load_durable(durable: &ContentCache, key: &str) -> Option<Vec<String>> {
    let bytes = match durable.get(&durable_key(key)) {
        Ok(bytes) => bytes?,
        Err(err) => {
            tracing::warn!(error = %err.message, "stored source list unreadable");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(sources) => Some(sources),
        Err(err) => {
            tracing::warn!(error = %err, "stored source list is malformed");
            None
        }
    }
}

fn store_durable(durable: &ContentCache, key: &str, sources: &[String]) {
    let stored = serde_json::to_vec(sources)
        .map_err(|e| e.to_string())
        .and_then(|bytes| {
            durable
                .put(&durable_key(key), &bytes)
                .map_err(|e| e.message)
        });
    if let Err(error) = stored {
        tracing::warn!(%error, "failed to store source list");
    }
}

/// Source identifiers across every repository, `local` first.
///
/// Lookups go to `memo`, then to `durable` (which outlives the process), then
/// to the network. A repository whose listing fails is reported in `errors`
/// and skipped. Only complete listings are remembered so failing repositories
/// are retried. `refresh` skips both stores and replaces what they hold.
pub fn discover_sources(
    clients: &[RepositoryClient],
    memo: &SourceListCache,
    durable: Option<&ContentCache>,
    refresh: bool,
) -> SourceListing {
    let key = memo_key(clients);

    if !refresh {
        if let Some(sources) = memo.get(&key) {
            tracing::debug!(count = sources.len(), "source list from memo");
            return SourceListing {
                sources,
                errors: Vec::new(),
                cached: true,
            };
        }
        if let Some(sources) = durable.and_then(|d| load_durable(d, &key)) {
            tracing::debug!(count = sources.len(), "source list from disk");
            memo.insert(key, sources.clone());
            return SourceListing {
                sources,
                errors: Vec::new(),
                cached: true,
            };
        }
    }

    let mut sources = vec![LOCAL_SOURCE.to_string()];
    let mut errors = Vec::new();

    for client in clients {
        match client.list_revisions() {
            Ok(revisions) => {
                sources.extend(
                    revisions
                        .into_iter()
                        .filter(|rev| rev != LOCAL_SOURCE)
                        .map(|rev| {
                            SourceSelector::Remote {
                                repo: client.repo().clone(),
                                revision: rev,
                            }
                            .identifier()
                        }),
                );
            }
            Err(err) => {
                tracing::warn!(repo = %client.repo(), error = %err.message, "skipping repository");
                errors.push(RepoListingError {
                    repository: client.repo().to_string(),
                    code: err.code.as_str().to_string(),
                    message: err.message,
                });
            }
        }
    }

    if errors.is_empty() {
        if let Some(durable) = durable {
            store_durable(durable, &key, &sources);
        }
        memo.insert(key, sources.clone());
    } else {
        if let Some(durable) = durable {
            if let Err(err) = durable.remove(&durable_key(&key)) {
                tracing::warn!(error = %err.message, "failed to drop stored source list");
            }
        }
        memo.remove(&key);
    }

    SourceListing {
        sources,
        errors,
        cached: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentCache;
    use crate::repo::RepoIdentity;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn client_for(server: &mockito::Server, owner: &str, name: &str, cache: Arc<ContentCache>) -> RepositoryClient {
        let config = crate::defaults::GithubConfig {
            api_base: server.url(),
            raw_base: server.url(),
            timeout_secs: 5,
            user_agent: "patchkit-test".to_string(),
        };
        RepositoryClient::new(
            RepoIdentity::new(owner, name),
            Endpoints::from(&config),
            Arc::new(ReqwestFetch::new(&config).unwrap()),
            cache,
        )
    }

    #[test]
    fn failing_repository_is_skipped_and_not_memoized() {
        let mut server = mockito::Server::new();
        let dir = tempdir().unwrap();
        let cache = Arc::new(ContentCache::open(dir.path()).unwrap());

        server
            .mock("GET", "/repos/good/one/branches")
            .with_status(200)
            .with_body(r#"[{"name":"main"},{"name":"dev"}]"#)
            .expect(2)
            .create();
        server
            .mock("GET", "/repos/good/one/releases")
            .with_status(200)
            .with_body(r#"[{"tag_name":"v2","draft":true},{"tag_name":"v1","draft":false}]"#)
            .expect(2)
            .create();
        server
            .mock("GET", "/repos/bad/two/branches")
            .with_status(500)
            .with_body("boom")
            .expect(2)
            .create();

        let clients = vec![
            client_for(&server, "good", "one", cache.clone()),
            client_for(&server, "bad", "two", cache),
        ];
        let memo = SourceListCache::default();

        let listing = discover_sources(&clients, &memo, None, false);
        assert_eq!(listing.sources, vec!["local", "good/one@main", "good/one@v1"]);
        assert_eq!(listing.errors.len(), 1);
        assert_eq!(listing.errors[0].repository, "bad/two");
        assert_eq!(listing.errors[0].code, "upstream.request_failed");
        assert!(!listing.cached);
        assert!(memo.is_empty());

        let again = discover_sources(&clients, &memo, None, false);
        assert!(!again.cached);
    }

    #[test]
    fn complete_listing_is_memoized_until_refresh() {
        let mut server = mockito::Server::new();
        let dir = tempdir().unwrap();
        let cache = Arc::new(ContentCache::open(dir.path()).unwrap());

        let branches = server
            .mock("GET", "/repos/o/n/branches")
            .with_status(200)
            .with_body(r#"[{"name":"main"}]"#)
            .expect(2)
            .create();
        server
            .mock("GET", "/repos/o/n/releases")
            .with_status(200)
            .with_body("[]")
            .expect(2)
            .create();

        let clients = vec![client_for(&server, "o", "n", cache)];
        let memo = SourceListCache::default();

        let first = discover_sources(&clients, &memo, None, false);
        let second = discover_sources(&clients, &memo, None, false);
        assert_eq!(first.sources, vec!["local", "o/n@main"]);
        assert_eq!(second.sources, first.sources);
        assert!(second.cached);

        let refreshed = discover_sources(&clients, &memo, None, true);
        assert!(!refreshed.cached);
        branches.assert();
    }

    #[test]
    fn stored_listing_outlives_the_memo() {
        let mut server = mockito::Server::new();
        let dir = tempdir().unwrap();
        let cache = Arc::new(ContentCache::open(dir.path()).unwrap());

        let branches = server
            .mock("GET", "/repos/o/n/branches")
            .with_status(200)
            .with_body(r#"[{"name":"main"}]"#)
            .expect(2)
            .create();
        server
            .mock("GET", "/repos/o/n/releases")
            .with_status(200)
            .with_body(r#"[{"tag_name":"v1","draft":false}]"#)
            .expect(2)
            .create();

        let clients = vec![client_for(&server, "o", "n", cache.clone())];

        let first = discover_sources(&clients, &SourceListCache::default(), Some(&cache), false);
        assert!(!first.cached);

        // A fresh memo stands in for a new process.
        let second = discover_sources(&clients, &SourceListCache::default(), Some(&cache), false);
        assert!(second.cached);
        assert_eq!(second.sources, vec!["local", "o/n@main", "o/n@v1"]);

        let refreshed = discover_sources(&clients, &SourceListCache::default(), Some(&cache), true);
        assert!(!refreshed.cached);
        assert_eq!(refreshed.sources, first.sources);
        branches.assert();
    }

    #[test]
    fn failed_listing_drops_stored_copy() {
        let mut server = mockito::Server::new();
        let dir = tempdir().unwrap();
        let cache = Arc::new(ContentCache::open(dir.path()).unwrap());

        server
            .mock("GET", "/repos/o/n/branches")
            .with_status(500)
            .with_body("down")
            .create();

        let clients = vec![client_for(&server, "o", "n", cache.clone())];
        let key = memo_key(&clients);
        store_durable(&cache, &key, &["local".to_string(), "o/n@old".to_string()]);

        let refreshed = discover_sources(&clients, &SourceListCache::default(), Some(&cache), true);
        assert_eq!(refreshed.errors.len(), 1);
        assert_eq!(load_durable(&cache, &key), None);
    }

    #[test]
    fn raw_fetch_goes_through_mock_server_once() {
        let mut server = mockito::Server::new();
        let dir = tempdir().unwrap();
        let cache = Arc::new(ContentCache::open(dir.path()).unwrap());

        let raw = server
            .mock("GET", "/o/n/v1/config/actions.yaml")
            .with_status(200)
            .with_body("actions: []\n")
            .expect(1)
            .create();

        let client = client_for(&server, "o", "n", cache);
        assert_eq!(client.fetch_config("v1").unwrap(), b"actions: []\n");
        assert_eq!(client.fetch_config("v1").unwrap(), b"actions: []\n");
        raw.assert();
    }
}

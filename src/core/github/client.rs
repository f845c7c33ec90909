use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::ContentCache;
use crate::defaults::GithubConfig;
use crate::error::{Error, Result, UpstreamDetails};
use crate::repo::RepoIdentity;
use crate::source::LOCAL_SOURCE;

use super::http::HttpFetch;

/// Directory holding the catalog and scripts inside a remote repository.
pub const SCRIPT_ROOT: &str = "config/";

pub const MAIN_BRANCH: &str = "main";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

/// Where the API and raw-content hosts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: String,
    pub raw_base: String,
}

impl Endpoints {
    pub fn new(api_base: impl Into<String>, raw_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            raw_base: raw_base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl From<&GithubConfig> for Endpoints {
    fn from(config: &GithubConfig) -> Self {
        Self::new(&config.api_base, &config.raw_base)
    }
}

/// Revision discovery and cached raw-file access for one repository.
#[derive(Clone)]
pub struct RepositoryClient {
    repo: RepoIdentity,
    endpoints: Endpoints,
    http: Arc<dyn HttpFetch>,
    cache: Arc<ContentCache>,
}

/// Strip a redundant leading script root so `config/x.sh` and `x.sh` agree.
pub fn script_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let relative = trimmed.strip_prefix(SCRIPT_ROOT).unwrap_or(trimmed);
    format!("{}{}", SCRIPT_ROOT, relative)
}

/// Revision list for a repository: `local` first, then `main` when the branch
/// exists, then every non-draft release tag in API order.
pub fn revisions_from(branches: &[Branch], releases: &[Release]) -> Vec<String> {
    let mut names = vec![LOCAL_SOURCE.to_string()];
    if branches.iter().any(|b| b.name == MAIN_BRANCH) {
        names.push(MAIN_BRANCH.to_string());
    }
    names.extend(
        releases
            .iter()
            .filter(|r| !r.draft)
            .map(|r| r.tag_name.clone()),
    );
    names
}

impl RepositoryClient {
    pub fn new(
        repo: RepoIdentity,
        endpoints: Endpoints,
        http: Arc<dyn HttpFetch>,
        cache: Arc<ContentCache>,
    ) -> Self {
        Self {
            repo,
            endpoints,
            http,
            cache,
        }
    }

    pub fn repo(&self) -> &RepoIdentity {
        &self.repo
    }

    fn api_url(&self, resource: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.endpoints.api_base, self.repo.owner, self.repo.name, resource
        )
    }

    pub fn raw_url(&self, revision: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.endpoints.raw_base,
            self.repo.owner,
            self.repo.name,
            revision,
            path.trim_start_matches('/')
        )
    }

    fn get_json<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        let url = self.api_url(resource);
        let response = self.http.get(&url)?;

        if !response.is_success() {
            return Err(Error::upstream(
                format!(
                    "GitHub API error for {}: HTTP {}",
                    self.repo, response.status
                ),
                UpstreamDetails {
                    url,
                    status: Some(response.status),
                    revision: None,
                    path: None,
                    body: Some(response.body_excerpt()),
                    error: None,
                },
            ));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            Error::upstream(
                format!("Unexpected GitHub API response for {}", self.repo),
                UpstreamDetails {
                    url,
                    status: Some(response.status),
                    revision: None,
                    path: None,
                    body: Some(response.body_excerpt()),
                    error: Some(e.to_string()),
                },
            )
        })
    }

    pub fn list_branches(&self) -> Result<Vec<Branch>> {
        let branches: Vec<Branch> = self.get_json("branches")?;
        tracing::debug!(repo = %self.repo, count = branches.len(), "listed branches");
        Ok(branches)
    }

    pub fn list_releases(&self) -> Result<Vec<Release>> {
        let releases: Vec<Release> = self.get_json("releases")?;
        tracing::debug!(repo = %self.repo, count = releases.len(), "listed releases");
        Ok(releases)
    }

    /// `local`, `main` if present, and every non-draft release tag. Both API
    /// calls must succeed; no partial list is returned.
    pub fn list_revisions(&self) -> Result<Vec<String>> {
        let branches = self.list_branches()?;
        let releases = self.list_releases()?;
        let revisions = revisions_from(&branches, &releases);
        tracing::info!(repo = %self.repo, ?revisions, "available revisions");
        Ok(revisions)
    }

    /// Raw file content at `revision`, served from the content cache when fresh.
    pub fn fetch_file(&self, revision: &str, path: &str) -> Result<Vec<u8>> {
        if revision == LOCAL_SOURCE {
            return Err(Error::source_invalid(LOCAL_SOURCE, "fetch a remote file"));
        }

        let url = self.raw_url(revision, path);

        match self.cache.get(&url) {
            Ok(Some(content)) => return Ok(content),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "cache read failed, fetching");
            }
        }

        let response = self.http.get(&url).map_err(|mut err| {
            if let Some(details) = err.details.as_object_mut() {
                details.insert("revision".to_string(), revision.into());
                details.insert("path".to_string(), path.into());
            }
            err
        })?;

        if !response.is_success() {
            return Err(Error::upstream(
                format!(
                    "Failed to download {} from {}@{}: HTTP {}",
                    path, self.repo, revision, response.status
                ),
                UpstreamDetails {
                    url,
                    status: Some(response.status),
                    revision: Some(revision.to_string()),
                    path: Some(path.to_string()),
                    body: None,
                    error: None,
                },
            ));
        }

        if let Err(err) = self.cache.put(&url, &response.body) {
            tracing::warn!(url = %url, error = %err, "failed to cache content");
        }

        tracing::info!(url = %url, bytes = response.body.len(), "downloaded");
        Ok(response.body)
    }

    pub fn fetch_config(&self, revision: &str) -> Result<Vec<u8>> {
        self.fetch_file(revision, &format!("{}{}", SCRIPT_ROOT, crate::catalog::CATALOG_FILE))
    }

    pub fn fetch_script(&self, revision: &str, path: &str) -> Result<Vec<u8>> {
        self.fetch_file(revision, &script_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::github::http::HttpResponse;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeHttp {
        responses: HashMap<String, (u16, Vec<u8>)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeHttp {
        fn with(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses
                .insert(url.to_string(), (status, body.as_bytes().to_vec()));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl HttpFetch for FakeHttp {
        fn get(&self, url: &str) -> Result<HttpResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some((status, body)) => Ok(HttpResponse {
                    status: *status,
                    body: body.clone(),
                }),
                None => Ok(HttpResponse {
                    status: 404,
                    body: b"Not Found".to_vec(),
                }),
            }
        }
    }

    const API: &str = "https://api.test";
    const RAW: &str = "https://raw.test";

    fn client(http: Arc<FakeHttp>, cache_dir: &std::path::Path) -> RepositoryClient {
        RepositoryClient::new(
            RepoIdentity::new("o", "n"),
            Endpoints::new(API, RAW),
            http,
            Arc::new(ContentCache::open(cache_dir).unwrap()),
        )
    }

    #[test]
    fn script_paths_are_normalized() {
        assert_eq!(script_path("setup.sh"), "config/setup.sh");
        assert_eq!(script_path("config/setup.sh"), "config/setup.sh");
        assert_eq!(script_path("/scripts/a.sh"), "config/scripts/a.sh");
    }

    #[test]
    fn revisions_skip_drafts_but_keep_prereleases() {
        let branches = vec![
            Branch { name: "dev".to_string() },
            Branch { name: "main".to_string() },
        ];
        let releases = vec![
            Release { tag_name: "v2".to_string(), name: None, draft: true, prerelease: false },
            Release { tag_name: "v1.1-rc".to_string(), name: None, draft: false, prerelease: true },
            Release { tag_name: "v1".to_string(), name: None, draft: false, prerelease: false },
        ];
        assert_eq!(
            revisions_from(&branches, &releases),
            vec!["local", "main", "v1.1-rc", "v1"]
        );
    }

    #[test]
    fn revisions_start_with_local_even_when_empty() {
        assert_eq!(revisions_from(&[], &[]), vec!["local"]);
    }

    #[test]
    fn list_revisions_requires_both_calls() {
        let dir = tempdir().unwrap();
        let http = Arc::new(
            FakeHttp::default().with(&format!("{}/repos/o/n/branches", API), 200, r#"[{"name":"main"}]"#),
        );
        let err = client(http, dir.path()).list_revisions().unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamRequestFailed);
        assert_eq!(err.details["status"], 404);
    }

    #[test]
    fn fetch_local_is_invalid_source() {
        let dir = tempdir().unwrap();
        let http = Arc::new(FakeHttp::default());
        let err = client(http.clone(), dir.path())
            .fetch_file("local", "config/actions.yaml")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SourceInvalid);
        assert!(http.calls().is_empty());
    }

    #[test]
    fn fetch_uses_cache_after_first_download() {
        let dir = tempdir().unwrap();
        let url = format!("{}/o/n/main/config/setup.sh", RAW);
        let http = Arc::new(FakeHttp::default().with(&url, 200, "echo setup"));
        let client = client(http.clone(), dir.path());

        assert_eq!(client.fetch_script("main", "setup.sh").unwrap(), b"echo setup");
        assert_eq!(
            client.fetch_script("main", "config/setup.sh").unwrap(),
            b"echo setup"
        );
        assert_eq!(http.calls(), vec![url]);
    }

    #[test]
    fn failed_fetch_is_not_cached_and_retries() {
        let dir = tempdir().unwrap();
        let http = Arc::new(FakeHttp::default());
        let client = client(http.clone(), dir.path());

        let err = client.fetch_config("v9").unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamRequestFailed);
        assert_eq!(err.details["path"], "config/actions.yaml");
        assert_eq!(err.details["revision"], "v9");
        assert_eq!(err.details["status"], 404);

        assert!(client.fetch_config("v9").is_err());
        assert_eq!(http.calls().len(), 2);
    }
}

//! Blocking HTTP transport used by the repository client.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::defaults::GithubConfig;
use crate::error::{Error, Result, UpstreamDetails};

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First few hundred characters of the body, for error details.
    pub fn body_excerpt(&self) -> String {
        String::from_utf8_lossy(&self.body).chars().take(300).collect()
    }
}

/// GET transport. Returns any HTTP status as a response; `Err` is reserved
/// for failures to obtain a response at all.
pub trait HttpFetch: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

pub struct ReqwestFetch {
    client: Client,
}

impl ReqwestFetch {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;
        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetch {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        tracing::debug!(url, "GET");
        let transport_error = |e: reqwest::Error| {
            Error::upstream(
                format!("HTTP request failed: {}", url),
                UpstreamDetails {
                    url: url.to_string(),
                    status: None,
                    revision: None,
                    path: None,
                    body: None,
                    error: Some(e.to_string()),
                },
            )
        };

        let response = self.client.get(url).send().map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(transport_error)?.to_vec();
        tracing::debug!(url, status, bytes = body.len(), "response");
        Ok(HttpResponse { status, body })
    }
}

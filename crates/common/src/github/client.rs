//! Authenticated GitHub REST client.
//!
//! A thin wrapper around a shared `reqwest::Client`. The underlying client
//! is internally synchronized, so one `GithubClient` may be cloned freely
//! and used from concurrent catalog refreshes and content fetches.
//!
//! No retry and no partial results: every operation either fully succeeds
//! or returns a [`RemoteError`] carrying the remote's own diagnostics.

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::models::{Asset, Release, Repository};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value; GitHub rejects requests without one.
const USER_AGENT_VALUE: &str = concat!("relfs/", env!("CARGO_PKG_VERSION"));

/// Page size used for paginated listings.
const PER_PAGE: usize = 100;

/// Media type requesting a JSON metadata document.
const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Media type requesting the raw binary representation of an asset.
const ACCEPT_OCTET_STREAM: &str = "application/octet-stream";

/// A failure at the remote service boundary.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid API url: {0}")]
    Url(#[from] url::ParseError),
}

/// GitHub REST API client with optional bearer authentication.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_base: Url,
    token: Option<String>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base.as_str())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl GithubClient {
    /// Create a client against the public GitHub API.
    pub fn new(token: Option<String>) -> Self {
        let api_base = Url::parse(DEFAULT_API_BASE).expect("hardcoded URL must parse");
        Self::with_api_base(api_base, token)
    }

    /// Create a client against a custom API base URL (GitHub Enterprise,
    /// or a stub server in tests).
    pub fn with_api_base(api_base: Url, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_base,
            token,
        }
    }

    /// Fetch repository metadata: id, full name, created/updated timestamps.
    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, RemoteError> {
        let url = self.api_base.join(&format!("repos/{}/{}", owner, repo))?;
        self.get_json(url).await
    }

    /// Fetch the complete release list for a repository, following
    /// pagination until the remote returns a short page.
    pub async fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>, RemoteError> {
        let url = self
            .api_base
            .join(&format!("repos/{}/{}/releases", owner, repo))?;
        self.get_paginated(url).await
    }

    /// Fetch the complete asset list for one release.
    pub async fn list_assets(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
    ) -> Result<Vec<Asset>, RemoteError> {
        let url = self
            .api_base
            .join(&format!("repos/{}/{}/releases/{}/assets", owner, repo, release_id))?;
        self.get_paginated(url).await
    }

    /// Fetch the full binary content of one asset.
    ///
    /// Issues a GET against the asset's API locator with octet-stream
    /// content negotiation (GitHub answers the default media type with a
    /// metadata document instead of bytes). The entire body is buffered in
    /// memory; there is no range support.
    pub async fn download_asset(&self, asset: &Asset) -> Result<Vec<u8>, RemoteError> {
        let response = self
            .authorize(self.client.get(&asset.url))
            .header(ACCEPT, ACCEPT_OCTET_STREAM)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body = response.bytes().await?;
        tracing::debug!(url = %asset.url, len = body.len(), "fetched asset content");
        Ok(body.to_vec())
    }

    /// GET a single JSON document.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let response = self
            .authorize(self.client.get(url))
            .header(ACCEPT, ACCEPT_JSON)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// GET a paginated collection, requesting `per_page` items at a time
    /// and stopping on the first short page.
    async fn get_paginated<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, RemoteError> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .authorize(self.client.get(url.clone()))
                .header(ACCEPT, ACCEPT_JSON)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
                .send()
                .await?;
            let response = Self::check_status(response).await?;

            let batch: Vec<T> = response.json().await?;
            let batch_len = batch.len();
            items.extend(batch);

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Attach User-Agent and, when configured, the bearer credential.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(USER_AGENT, USER_AGENT_VALUE);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Turn a non-success response into a [`RemoteError::Status`] carrying
    /// the remote's status code and message verbatim.
    async fn check_status(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.text().await {
            Ok(body) if !body.is_empty() => body,
            _ => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

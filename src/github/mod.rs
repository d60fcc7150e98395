use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::credentials::Credentials;

pub mod model;

pub use model::{AuthenticatedUser, RepositoryRecord};

const ACCEPT_GITHUB_V3: &str = "application/vnd.github.v3+json";

/// One page of a target's public repository listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Items(Vec<RepositoryRecord>),
    /// The API returned an empty array; there is nothing past this page.
    Exhausted,
}

impl Page {
    pub fn from_items(items: Vec<RepositoryRecord>) -> Self {
        if items.is_empty() {
            Page::Exhausted
        } else {
            Page::Items(items)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchErrorKind {
    #[error("status code {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid listing body: {0}")]
    Decode(String),
    #[error("could not build request: {0}")]
    InvalidRequest(String),
}

/// A single page request that did not yield a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("could not fetch page {page} of {target}'s repositories: {kind}")]
pub struct FetchError {
    pub target: String,
    pub page: u32,
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(target: &str, page: u32, kind: FetchErrorKind) -> Self {
        Self {
            target: target.to_string(),
            page,
            kind,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            FetchErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication failed with status code {status}")]
    Rejected { status: u16 },
    #[error("failed to reach the API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid /user response body: {0}")]
    Decode(String),
    #[error("could not build request: {0}")]
    InvalidRequest(String),
}

/// Paged listing of a target's public repositories.
#[async_trait]
pub trait RepoListing: Send + Sync {
    /// Fetch one 1-based page. Exactly one HTTP attempt is made.
    async fn fetch_page(
        &self,
        target: &str,
        page: u32,
        credentials: &Credentials,
    ) -> Result<Page, FetchError>;
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GithubClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(config::DEFAULT_API_BASE).context("invalid default API URL")?;
        Self::with_base_url(base_url, timeout)
    }

    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("API base URL {} cannot carry a path", base_url));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &config::Github) -> Result<Self> {
        let base_url = Url::parse(&cfg.api_base)
            .with_context(|| format!("invalid github.api_base: {}", cfg.api_base))?;
        Self::with_base_url(base_url, Duration::from_secs(cfg.timeout_seconds))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        builder
            .header(USER_AGENT, &credentials.caller)
            .header(AUTHORIZATION, format!("Bearer {}", credentials.token))
            .header(ACCEPT, ACCEPT_GITHUB_V3)
    }

    pub fn build_page_request(
        &self,
        target: &str,
        page: u32,
        credentials: &Credentials,
    ) -> Result<reqwest::Request> {
        let mut url = self.endpoint(&["users", target, "repos"])?;
        url.query_pairs_mut()
            .append_pair("type", "public")
            .append_pair("page", &page.to_string());
        self.authorized(self.http.get(url), credentials)
            .build()
            .context("failed to build listing request")
    }

    pub fn build_auth_request(&self, credentials: &Credentials) -> Result<reqwest::Request> {
        let url = self.endpoint(&["user"])?;
        self.authorized(self.http.get(url), credentials)
            .build()
            .context("failed to build authentication request")
    }

    /// Check the token against `GET /user` and return the authenticated login.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthenticatedUser, AuthError> {
        let request = self
            .build_auth_request(credentials)
            .map_err(|err| AuthError::InvalidRequest(format!("{:#}", err)))?;
        let res = self.http.execute(request).await?;
        if res.status() != StatusCode::OK {
            return Err(AuthError::Rejected {
                status: res.status().as_u16(),
            });
        }
        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|err| AuthError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RepoListing for GithubClient {
    async fn fetch_page(
        &self,
        target: &str,
        page: u32,
        credentials: &Credentials,
    ) -> Result<Page, FetchError> {
        let fail = |kind| FetchError::new(target, page, kind);

        let request = self
            .build_page_request(target, page, credentials)
            .map_err(|err| fail(FetchErrorKind::InvalidRequest(format!("{:#}", err))))?;
        debug!(url=%request.url(), "requesting repository page");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(|err| fail(FetchErrorKind::Network(err.to_string())))?;
        let status = res.status();
        if status != StatusCode::OK {
            return Err(fail(FetchErrorKind::Status(status.as_u16())));
        }

        let body = res
            .text()
            .await
            .map_err(|err| fail(FetchErrorKind::Network(err.to_string())))?;
        let items: Vec<RepositoryRecord> = serde_json::from_str(&body)
            .map_err(|err| fail(FetchErrorKind::Decode(err.to_string())))?;
        debug!(items = items.len(), "received repository page");
        Ok(Page::from_items(items))
    }
}

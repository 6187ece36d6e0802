use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::GitHubConfig;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Error)]
pub enum GitHubError {
    /// Non-success HTTP status from the API, with status line and body.
    #[error("GitHub API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("missing GitHub token: pass --token, set GITHUB_TOKEN, or run `gh auth login`")]
    MissingToken,

    #[error("credential lookup failed: {0}")]
    Credential(String),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    pub(crate) base_url: String,
    pub(crate) owner: String,
    pub(crate) repo: String,
    token: String,
    per_page: u32,
    user_agent: String,
    http: reqwest::Client,
}

impl GitHubClient {
    /// Create a new `GitHubClient` from an explicit [`GitHubConfig`].
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let token = config
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(GitHubError::MissingToken)?;

        Ok(Self {
            base_url: DEFAULT_API_URL.to_string(),
            owner: config.owner,
            repo: config.repo,
            token,
            per_page: 100,
            user_agent: concat!("prwatch/", env!("CARGO_PKG_VERSION")).to_string(),
            http: reqwest::Client::new(),
        })
    }

    /// Point the client at a different API root (GitHub Enterprise, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Page size for list endpoints, clamped to the API maximum of 100.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the configured owner (org or user).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the configured repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/repos/{owner}/{repo}` prefix for repository-scoped routes.
    pub(crate) fn repo_path(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.repo)
    }

    // -- request helpers ----------------------------------------------------

    fn request(&self, method: reqwest::Method, path: &str, accept: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, accept)
            .header(USER_AGENT, &self.user_agent)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(GitHubError::Api(format!(
            "{} {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            body
        )))
    }

    pub(crate) async fn api_get_raw(&self, path: &str, accept: &str) -> Result<reqwest::Response> {
        let resp = self.request(reqwest::Method::GET, path, accept).send().await?;
        Self::check(resp).await
    }

    pub(crate) async fn api_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.api_get_raw(path, JSON_MEDIA_TYPE).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub(crate) async fn api_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let resp = self
            .request(reqwest::Method::POST, path, JSON_MEDIA_TYPE)
            .json(body)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    // -- pagination ----------------------------------------------------------

    /// Fetch every page of a list endpoint into `out`, in response order.
    ///
    /// Stops at the first empty page or the first response without a
    /// `rel="next"` link. On error, `out` keeps the pages fetched so far.
    pub(crate) async fn fetch_pages_into<T: DeserializeOwned>(
        &self,
        path: &str,
        out: &mut Vec<T>,
    ) -> Result<()> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut page = 1u32;
        loop {
            let paged = format!("{path}{sep}per_page={}&page={page}", self.per_page);
            let resp = self.api_get_raw(&paged, JSON_MEDIA_TYPE).await?;
            let more = has_next_page(resp.headers());
            let text = resp.text().await?;
            let items: Vec<T> = serde_json::from_str(&text)?;

            tracing::trace!(path, page, count = items.len(), more, "fetched page");
            if items.is_empty() {
                return Ok(());
            }
            out.extend(items);
            if !more {
                return Ok(());
            }
            page += 1;
        }
    }

    /// All pages of a list endpoint, or the first error.
    pub async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        self.fetch_pages_into(path, &mut out).await?;
        Ok(out)
    }

    /// All pages of a list endpoint; a failure is logged and whatever was
    /// accumulated before it is returned.
    pub async fn fetch_all_lossy<T: DeserializeOwned>(&self, path: &str, what: &str) -> Vec<T> {
        let mut out = Vec::new();
        if let Err(e) = self.fetch_pages_into(path, &mut out).await {
            tracing::warn!(
                what,
                fetched = out.len(),
                error = %e,
                "failed to fetch {what}; continuing with partial results"
            );
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Link header
// ---------------------------------------------------------------------------

/// Parse an RFC 8288 `Link` header into `(url, rel)` pairs.
pub fn parse_link_header(value: &str) -> Vec<(String, String)> {
    value
        .split(',')
        .filter_map(|part| {
            let mut segments = part.split(';');
            let url = segments
                .next()?
                .trim()
                .strip_prefix('<')?
                .strip_suffix('>')?
                .to_string();
            let rel = segments.find_map(|s| {
                let s = s.trim();
                s.strip_prefix("rel=")
                    .map(|r| r.trim_matches('"').to_string())
            })?;
            Some((url, rel))
        })
        .collect()
}

/// Whether the response advertises a next page.
pub fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(parse_link_header)
        .any(|(_, rel)| rel.split_whitespace().any(|r| r == "next"))
}

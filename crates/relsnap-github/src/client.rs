//! GitHub REST client
//!
//! One request per lookup, no retries and no request timeout.

use crate::error::FetchError;
use crate::provider::ReleaseProvider;
use relsnap_core::{ReleaseData, RepositoryLocator, SyncConfig};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Media type asking GitHub to render release bodies as HTML
pub const RELEASE_MEDIA_TYPE: &str = "application/vnd.github.v3.html";

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Error body returned by the GitHub API
#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// GitHub release provider
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create client for `api_base` (e.g. `https://api.github.com`)
    ///
    /// # Errors
    /// `FetchError::Transport` if the HTTP client cannot be initialized.
    pub fn new(api_base: impl Into<String>, user_agent: &str) -> Result<Self, FetchError> {
        let http = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create client from sync configuration
    ///
    /// # Errors
    /// `FetchError::Transport` if the HTTP client cannot be initialized.
    pub fn from_config(config: &SyncConfig) -> Result<Self, FetchError> {
        let client = Self::new(config.api_base_url.clone(), &config.user_agent)?;
        Ok(match &config.github_token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        })
    }

    /// With API token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Endpoint for the latest release of `locator`
    #[must_use]
    pub fn latest_release_url(&self, locator: &RepositoryLocator) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base,
            locator.owner(),
            locator.name()
        )
    }
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ReleaseProvider for GitHubClient {
    async fn latest_release(&self, locator: &RepositoryLocator) -> Result<ReleaseData, FetchError> {
        let mut request = self
            .http
            .get(self.latest_release_url(locator))
            .header(ACCEPT, RELEASE_MEDIA_TYPE);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }

        if status.is_success() {
            let body: Value = response
                .json()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            return Ok(ReleaseData::new(body));
        }

        let exhausted = response
            .headers()
            .get(RATE_LIMIT_REMAINING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");
        let rate_limited = exhausted
            && matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS);

        let message = response.json::<ApiMessage>().await.ok().map(|m| m.message);
        tracing::debug!(repo = %locator, status = status.as_u16(), ?message, "release lookup failed");

        if rate_limited {
            Err(FetchError::RateLimited { message })
        } else {
            Err(FetchError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

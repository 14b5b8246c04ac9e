//! Release lookup errors
//!
//! Every variant is contained at the item boundary: the caller records a
//! null release and moves on. `NotFound` is the only one that is not worth
//! surfacing to operators.

use relsnap_core::LocatorError;

/// Failure of a single release lookup
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Repository locator could not be decomposed into owner/repository
    #[error("malformed repository locator: {0}")]
    MalformedLocator(#[from] LocatorError),

    /// Provider confirms no release exists
    #[error("no release found")]
    NotFound,

    /// Provider refused the request because the rate limit is exhausted
    #[error("rate limited by provider{}", suffix(.message))]
    RateLimited {
        /// Provider-supplied explanation
        message: Option<String>,
    },

    /// Provider answered with an unexpected status
    #[error("provider returned HTTP {status}{}", suffix(.message))]
    Status {
        /// HTTP status code
        status: u16,
        /// Provider-supplied explanation
        message: Option<String>,
    },

    /// Network or TLS failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Success response whose body was not JSON
    #[error("invalid release payload: {0}")]
    Decode(String),

    /// Provider panicked during the lookup
    #[error("provider panicked: {0}")]
    Panicked(String),
}

impl FetchError {
    /// Whether the provider confirmed that no release exists
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Whether the failure is due to rate limiting
    #[inline]
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP status, when the provider answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

//! Error types for relsnap core
//!
//! - Repository locator parsing failures
//! - Configuration failures (environment or CLI supplied values)

/// Repository locator could not be decomposed into owner and repository name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    /// Locator string is empty
    #[error("repository locator is empty")]
    Empty,

    /// Locator points at a host other than GitHub
    #[error("unsupported repository host: {0}")]
    UnsupportedHost(String),

    /// Locator has a scheme but is not a well-formed URL
    #[error("invalid repository URL {input:?}: {source}")]
    InvalidUrl {
        /// The offending input
        input: String,
        /// Parser failure
        #[source]
        source: url::ParseError,
    },

    /// Owner or repository segment missing
    #[error("repository locator has no owner/repository path: {0}")]
    MissingSegments(String),

    /// Owner or repository segment contains characters GitHub does not allow
    #[error("invalid characters in repository locator: {0}")]
    InvalidCharacters(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Human interval string could not be parsed
    #[error("invalid interval {value:?}: {reason}")]
    InvalidInterval {
        /// The offending input
        value: String,
        /// What went wrong
        reason: String,
    },

    /// Concurrency must admit at least one fetch
    #[error("max concurrency must be a positive integer, got {0}")]
    InvalidConcurrency(usize),
}

impl ConfigError {
    pub(crate) fn interval(value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

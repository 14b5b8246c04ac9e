//! Provider seam
//!
//! Implemented by `GitHubClient` in production and by scripted providers in
//! tests.

use crate::error::FetchError;
use relsnap_core::{ReleaseData, RepositoryLocator};

/// Source of "latest release" metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReleaseProvider: Send + Sync {
    /// Look up the latest published release of `locator`
    ///
    /// # Errors
    /// `FetchError::NotFound` when the repository has no releases; any other
    /// variant for transport, rate-limit or provider failures.
    async fn latest_release(&self, locator: &RepositoryLocator) -> Result<ReleaseData, FetchError>;
}

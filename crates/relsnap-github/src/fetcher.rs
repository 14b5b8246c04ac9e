//! Release fetcher
//!
//! Turns one catalog item into one classified outcome. `NotFound` and
//! `Error` end up recorded the same way (a null release); the split exists
//! so that only real failures get reported.

use crate::error::FetchError;
use crate::provider::ReleaseProvider;
use futures::FutureExt;
use relsnap_core::{CatalogItem, ReleaseData, RepositoryLocator};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Classified result of one release lookup
#[derive(Debug)]
pub enum ReleaseOutcome {
    /// Provider returned release metadata
    Found(ReleaseData),
    /// Provider confirmed no release is published
    NotFound,
    /// Any other failure
    Error(FetchError),
}

impl ReleaseOutcome {
    /// Classify a provider result
    #[must_use]
    pub fn from_result(result: Result<ReleaseData, FetchError>) -> Self {
        match result {
            Ok(data) => Self::Found(data),
            Err(FetchError::NotFound) => Self::NotFound,
            Err(err) => Self::Error(err),
        }
    }

    /// Release to record, if any
    #[inline]
    #[must_use]
    pub fn release(&self) -> Option<&ReleaseData> {
        match self {
            Self::Found(data) => Some(data),
            _ => None,
        }
    }
}

/// Performs release lookups for catalog items
#[derive(Clone)]
pub struct ReleaseFetcher {
    provider: Arc<dyn ReleaseProvider>,
}

impl ReleaseFetcher {
    /// Create fetcher over `provider`
    #[inline]
    #[must_use]
    pub fn new(provider: Arc<dyn ReleaseProvider>) -> Self {
        Self { provider }
    }

    /// Look up the latest release of `item`
    ///
    /// Never fails as a whole: locator and provider failures come back as
    /// `ReleaseOutcome::Error`, and so does a provider panic.
    pub async fn fetch_latest_release(&self, item: &CatalogItem) -> ReleaseOutcome {
        let locator = match RepositoryLocator::parse(&item.repository_locator) {
            Ok(locator) => locator,
            Err(err) => return ReleaseOutcome::Error(err.into()),
        };

        tracing::debug!(slug = %item.slug, repo = %locator, "fetching latest release");
        let lookup = AssertUnwindSafe(async { self.provider.latest_release(&locator).await });
        match lookup.catch_unwind().await {
            Ok(result) => ReleaseOutcome::from_result(result),
            Err(payload) => {
                ReleaseOutcome::Error(FetchError::Panicked(panic_message(payload.as_ref())))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl std::fmt::Debug for ReleaseFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseFetcher").finish_non_exhaustive()
    }
}

//! Staleness policy
//!
//! An entry needs refreshing when:
//! - the previous snapshot has no entry for the slug, or
//! - the entry has no fetch timestamp, or
//! - `fetched_at + ttl < now`
//!
//! Pure functions only; no I/O.

use crate::model::{ReleaseCacheEntry, Snapshot};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Whether the cached entry for `slug` must be refreshed
#[must_use]
pub fn is_stale(slug: &str, previous: &Snapshot, ttl: Duration, now: DateTime<Utc>) -> bool {
    StalenessPolicy::new(ttl).is_stale(slug, previous, now)
}

/// TTL-based staleness policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    ttl: Duration,
}

impl StalenessPolicy {
    /// Create policy with the given time-to-live
    #[inline]
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Configured time-to-live
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the cached entry for `slug` must be refreshed
    #[inline]
    #[must_use]
    pub fn is_stale(&self, slug: &str, previous: &Snapshot, now: DateTime<Utc>) -> bool {
        self.fresh_entry(slug, previous, now).is_none()
    }

    /// The previous entry for `slug` if it can be carried over unchanged
    #[must_use]
    pub fn fresh_entry<'a>(
        &self,
        slug: &str,
        previous: &'a Snapshot,
        now: DateTime<Utc>,
    ) -> Option<&'a ReleaseCacheEntry> {
        previous
            .get(slug)
            .filter(|entry| !self.entry_expired(entry, now))
    }

    /// Whether a single entry has outlived the TTL
    #[must_use]
    pub fn entry_expired(&self, entry: &ReleaseCacheEntry, now: DateTime<Utc>) -> bool {
        let Some(fetched_at) = &entry.latest_release_fetched_at else {
            return true;
        };
        // A TTL too large to represent never expires.
        let Some(expires_at) = TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| fetched_at.instant().checked_add_signed(ttl))
        else {
            return false;
        };
        expires_at < now
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RELEASE_CACHE_TTL)
    }
}

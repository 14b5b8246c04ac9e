//! Testing utilities for relsnap workspace
//!
//! Shared fixtures, a scripted release provider and a pinned clock.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use relsnap_core::{
    CatalogItem, Clock, FetchTimestamp, ReleaseCacheEntry, ReleaseData, RepositoryLocator, Snapshot,
};
use relsnap_github::{FetchError, ReleaseProvider};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Reference "now" used across tests: 2024-05-01T12:00:00Z
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    test_now() - TimeDelta::hours(hours)
}

pub fn repo_url(slug: &str) -> String {
    format!("https://github.com/{slug}-dev/{slug}")
}

/// Provider-side key for the repository behind `repo_url(slug)`
pub fn locator_key(slug: &str) -> String {
    format!("{slug}-dev/{slug}")
}

pub fn catalog_item(slug: &str) -> CatalogItem {
    CatalogItem::new(slug, repo_url(slug))
}

pub fn catalog(slugs: &[&str]) -> Vec<CatalogItem> {
    slugs.iter().map(|s| catalog_item(s)).collect()
}

pub fn release_json(tag: &str) -> Value {
    json!({
        "tag_name": tag,
        "name": tag,
        "html_url": format!("https://github.com/example/example/releases/tag/{tag}"),
        "published_at": "2024-04-30T08:00:00Z",
        "body_html": "<p>Release notes</p>"
    })
}

pub fn cached_entry(release: Option<Value>, fetched_at: DateTime<Utc>) -> ReleaseCacheEntry {
    ReleaseCacheEntry::fetched(
        release.map(ReleaseData::new),
        FetchTimestamp::from_datetime(fetched_at),
    )
}

pub fn snapshot<'a>(entries: impl IntoIterator<Item = (&'a str, ReleaseCacheEntry)>) -> Snapshot {
    entries
        .into_iter()
        .map(|(slug, entry)| (slug.to_string(), entry))
        .collect()
}

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock() += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(test_now())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Scripted response for one repository
#[derive(Debug, Clone)]
pub enum Script {
    Release(Value),
    NotFound,
    Status(u16),
    RateLimited,
    /// Panic inside the lookup with this message
    Panic(String),
}

impl Script {
    fn respond(&self) -> Result<ReleaseData, FetchError> {
        match self {
            Self::Release(body) => Ok(ReleaseData::new(body.clone())),
            Self::NotFound => Err(FetchError::NotFound),
            Self::Status(status) => Err(FetchError::Status {
                status: *status,
                message: Some("scripted failure".to_string()),
            }),
            Self::RateLimited => Err(FetchError::RateLimited {
                message: Some("API rate limit exceeded".to_string()),
            }),
            Self::Panic(message) => panic!("{message}"),
        }
    }
}

/// In-memory provider answering from a script, recording every call
///
/// Unscripted repositories answer `NotFound`.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Script>,
    latency: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, slug: &str, script: Script) -> Self {
        self.scripts.insert(locator_key(slug), script);
        self
    }

    pub fn with_release(self, slug: &str, tag: &str) -> Self {
        self.with_script(slug, Script::Release(release_json(tag)))
    }

    pub fn with_not_found(self, slug: &str) -> Self {
        self.with_script(slug, Script::NotFound)
    }

    pub fn with_status(self, slug: &str, status: u16) -> Self {
        self.with_script(slug, Script::Status(status))
    }

    pub fn with_panic(self, slug: &str, message: &str) -> Self {
        self.with_script(slug, Script::Panic(message.to_string()))
    }

    /// Every lookup sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Repositories looked up, in call order (`owner/repo`)
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn was_called_for(&self, slug: &str) -> bool {
        let key = locator_key(slug);
        self.calls.lock().iter().any(|c| *c == key)
    }

    /// Highest number of lookups observed in progress at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseProvider for ScriptedProvider {
    async fn latest_release(&self, locator: &RepositoryLocator) -> Result<ReleaseData, FetchError> {
        let key = locator.to_string();
        self.calls.lock().push(key.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.scripts
            .get(&key)
            .map_or(Err(FetchError::NotFound), Script::respond)
    }
}

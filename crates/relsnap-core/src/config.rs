//! Synchronization configuration
//!
//! Values come from three layers, later ones winning:
//! 1. Built-in defaults (`SyncConfig::default()`)
//! 2. Environment (`MAX_CONCURRENCY`, `RELEASE_CACHE_TTL`, `GH_TOKEN`/`GITHUB_TOKEN`)
//! 3. Explicit overrides (CLI flags, via the `with_*` builders)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of simultaneous release lookups
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default lifetime of a cached release entry (4 hours)
pub const DEFAULT_RELEASE_CACHE_TTL: Duration = Duration::from_secs(4 * 60 * 60);

/// Default delay between the pool going idle and the snapshot being written
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Default GitHub REST endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Environment variable names
pub mod env {
    /// Concurrency limit
    pub const MAX_CONCURRENCY: &str = "MAX_CONCURRENCY";
    /// Cache TTL as a human interval
    pub const RELEASE_CACHE_TTL: &str = "RELEASE_CACHE_TTL";
    /// Preferred token variable
    pub const GH_TOKEN: &str = "GH_TOKEN";
    /// Fallback token variable
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
}

/// Process-wide synchronization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum release lookups in flight at once
    pub max_concurrency: usize,
    /// Cached entries younger than this are carried over
    pub release_cache_ttl: Duration,
    /// Pause after the last fetch settles, before persisting
    pub settle_delay: Duration,
    /// Snapshot file read at start and overwritten at completion
    pub snapshot_path: PathBuf,
    /// Catalog file enumerating the apps
    pub catalog_path: PathBuf,
    /// Provider API base URL
    pub api_base_url: String,
    /// Optional provider token
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
    /// User-Agent sent to the provider
    pub user_agent: String,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the process environment
    ///
    /// # Errors
    /// `InvalidInterval` if `RELEASE_CACHE_TTL` is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    ///
    /// A `MAX_CONCURRENCY` that is not a positive integer falls back to the
    /// default rather than failing.
    ///
    /// # Errors
    /// `InvalidInterval` if `RELEASE_CACHE_TTL` is set but unparseable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(env::MAX_CONCURRENCY) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_concurrency = n,
                _ => tracing::warn!(
                    value = %raw,
                    default = DEFAULT_MAX_CONCURRENCY,
                    "ignoring invalid MAX_CONCURRENCY"
                ),
            }
        }

        if let Some(raw) = lookup(env::RELEASE_CACHE_TTL).filter(|v| !v.trim().is_empty()) {
            config.release_cache_ttl = parse_interval(&raw)?;
        }

        config.github_token = lookup(env::GH_TOKEN)
            .or_else(|| lookup(env::GITHUB_TOKEN))
            .filter(|t| !t.trim().is_empty());

        Ok(config)
    }

    /// With max concurrency
    ///
    /// # Errors
    /// `InvalidConcurrency` when `max` is zero.
    pub fn with_max_concurrency(mut self, max: usize) -> Result<Self, ConfigError> {
        if max == 0 {
            return Err(ConfigError::InvalidConcurrency(max));
        }
        self.max_concurrency = max;
        Ok(self)
    }

    /// With cache TTL
    #[inline]
    #[must_use]
    pub fn with_release_cache_ttl(mut self, ttl: Duration) -> Self {
        self.release_cache_ttl = ttl;
        self
    }

    /// With settle delay
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// With snapshot path
    #[inline]
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    /// With catalog path
    #[inline]
    #[must_use]
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    /// With API base URL
    #[inline]
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// With provider token
    #[inline]
    #[must_use]
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            release_cache_ttl: DEFAULT_RELEASE_CACHE_TTL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            snapshot_path: PathBuf::from("meta/releases.json"),
            catalog_path: PathBuf::from("meta/apps.json"),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            github_token: None,
            user_agent: format!("relsnap/{}", crate::VERSION),
        }
    }
}

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;
const MS_PER_WEEK: f64 = 7.0 * MS_PER_DAY;
const MS_PER_MONTH: f64 = 30.0 * MS_PER_DAY;
const MS_PER_YEAR: f64 = 365.0 * MS_PER_DAY;

/// Parse a human interval such as `"4 hours"`, `"1 day and 30 minutes"`,
/// `"90m"`, `"an hour"` or a bare millisecond count (`"3600000"`)
///
/// # Errors
/// `InvalidInterval` naming the token that could not be understood.
pub fn parse_interval(input: &str) -> Result<Duration, ConfigError> {
    let normalized = input.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(ConfigError::interval(input, "empty interval"));
    }

    if let Ok(ms) = normalized.parse::<f64>() {
        return millis_to_duration(input, ms);
    }

    let tokens: Vec<&str> = normalized
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty() && *t != "and")
        .collect();

    let mut total_ms = 0.0;
    let mut pending: Option<f64> = None;

    for token in tokens {
        if let Some(quantity) = pending.take() {
            let unit = unit_millis(token)
                .ok_or_else(|| ConfigError::interval(input, format!("unknown unit {token:?}")))?;
            total_ms += quantity * unit;
            continue;
        }

        if let Some(quantity) = quantity_word(token).or_else(|| token.parse::<f64>().ok()) {
            pending = Some(quantity);
            continue;
        }

        // Compact form: "90m", "1.5h"
        let split = token
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .filter(|&i| i > 0)
            .ok_or_else(|| ConfigError::interval(input, format!("unexpected token {token:?}")))?;
        let (number, unit) = token.split_at(split);
        let quantity: f64 = number
            .parse()
            .map_err(|_| ConfigError::interval(input, format!("bad number {number:?}")))?;
        let unit = unit_millis(unit)
            .ok_or_else(|| ConfigError::interval(input, format!("unknown unit {unit:?}")))?;
        total_ms += quantity * unit;
    }

    if pending.is_some() {
        return Err(ConfigError::interval(input, "number without a unit"));
    }

    millis_to_duration(input, total_ms)
}

fn millis_to_duration(input: &str, ms: f64) -> Result<Duration, ConfigError> {
    if !ms.is_finite() || ms < 0.0 {
        return Err(ConfigError::interval(input, "interval must be a non-negative number"));
    }
    Duration::try_from_secs_f64(ms / MS_PER_SECOND)
        .map_err(|e| ConfigError::interval(input, e.to_string()))
}

fn quantity_word(token: &str) -> Option<f64> {
    let n = match token {
        "a" | "an" | "one" => 1.0,
        "two" => 2.0,
        "three" => 3.0,
        "four" => 4.0,
        "five" => 5.0,
        "six" => 6.0,
        "seven" => 7.0,
        "eight" => 8.0,
        "nine" => 9.0,
        "ten" => 10.0,
        _ => return None,
    };
    Some(n)
}

fn unit_millis(unit: &str) -> Option<f64> {
    let ms = match unit {
        "ms" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => MS_PER_SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MS_PER_MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => MS_PER_HOUR,
        "d" | "day" | "days" => MS_PER_DAY,
        "w" | "week" | "weeks" => MS_PER_WEEK,
        "month" | "months" => MS_PER_MONTH,
        "y" | "year" | "years" => MS_PER_YEAR,
        _ => return None,
    };
    Some(ms)
}

//! relsnap Core
//!
//! Shared building blocks for the release snapshot synchronizer:
//! - Snapshot data model (`Snapshot`, `ReleaseCacheEntry`, `FetchTimestamp`)
//! - Staleness policy deciding which cached entries must be refreshed
//! - GitHub repository locator parsing
//! - Process-wide configuration (`SyncConfig`) and human interval parsing
//!
//! # Example
//!
//! ```rust
//! use relsnap_core::{is_stale, Snapshot};
//! use std::time::Duration;
//!
//! let previous = Snapshot::default();
//! let now = chrono::Utc::now();
//! assert!(is_stale("hyper", &previous, Duration::from_secs(4 * 3600), now));
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod config;
pub mod error;
pub mod locator;
pub mod model;
pub mod staleness;

pub use clock::{Clock, SystemClock};
pub use config::{parse_interval, SyncConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_RELEASE_CACHE_TTL};
pub use error::{ConfigError, LocatorError};
pub use locator::RepositoryLocator;
pub use model::{CatalogItem, FetchTimestamp, ReleaseCacheEntry, ReleaseData, Snapshot};
pub use staleness::{is_stale, StalenessPolicy};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

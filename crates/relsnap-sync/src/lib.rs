//! relsnap Sync - release snapshot synchronizer
//!
//! Refreshes the latest-release snapshot of an app catalog:
//! - Loads the previous snapshot (missing or malformed is fatal)
//! - Carries over entries younger than the TTL
//! - Looks up everything else with bounded concurrency
//! - Writes the next snapshot once all lookups have settled
//!
//! # Example
//!
//! ```rust,ignore
//! use relsnap_core::{SyncConfig, SystemClock};
//! use relsnap_github::GitHubClient;
//! use relsnap_sync::{sync_catalog, Catalog};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::from_env()?;
//! let catalog = Catalog::load(&config.catalog_path).await?;
//! let provider = Arc::new(GitHubClient::from_config(&config)?);
//!
//! let done = sync_catalog(&config, &catalog, provider, Arc::new(SystemClock)).await?;
//! println!("wrote {} entries", done.entries());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod accumulator;
pub mod catalog;
pub mod completion;
pub mod engine;
pub mod error;
pub mod store;
pub mod verify;

pub use accumulator::{RecordCounts, RecordKind, SnapshotAccumulator};
pub use catalog::{Catalog, CatalogApp};
pub use completion::{CompletionHandler, RunCompleted, SyncReport};
pub use engine::{EngineRun, ItemFailure, SyncEngine};
pub use error::{CatalogError, StoreError, SyncError};
pub use store::SnapshotStore;
pub use verify::{verify_coverage, CoverageReport};

use relsnap_core::{CatalogItem, Clock, SyncConfig};
use relsnap_github::ReleaseProvider;
use std::sync::Arc;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run one full pass over `catalog`
///
/// # Errors
/// See [`sync_releases`].
pub async fn sync_catalog(
    config: &SyncConfig,
    catalog: &Catalog,
    provider: Arc<dyn ReleaseProvider>,
    clock: Arc<dyn Clock>,
) -> Result<RunCompleted, SyncError> {
    let items = catalog.with_github_repos();
    tracing::info!("{} of {} apps have a GitHub repo.", items.len(), catalog.len());
    sync_releases(config, &items, provider, clock).await
}

/// Run one full pass over `items`
///
/// # Errors
/// `SyncError::FatalStartup` if the previous snapshot cannot be read (no
/// lookup is made), engine errors, and persistence failures.
pub async fn sync_releases(
    config: &SyncConfig,
    items: &[CatalogItem],
    provider: Arc<dyn ReleaseProvider>,
    clock: Arc<dyn Clock>,
) -> Result<RunCompleted, SyncError> {
    let store = SnapshotStore::new(&config.snapshot_path);
    let previous = store.load().await.map_err(SyncError::FatalStartup)?;

    let engine = SyncEngine::from_config(config, provider).with_clock(clock);
    let now = engine.now();
    let stale = engine.stale_items(items, &previous, now).len();
    tracing::info!(
        "{} of those {} have missing or outdated release data.",
        stale,
        items.len()
    );

    let run = engine.run_at(items, &previous, now).await?;
    CompletionHandler::new(store, config.settle_delay)
        .complete(run)
        .await
}

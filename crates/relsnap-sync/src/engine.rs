//! Synchronization engine
//!
//! Walks the catalog once. Fresh entries are carried over on the spot;
//! everything else is queued on a `ConcurrencyGate` as one release lookup.
//! The run ends when the gate reports idle.

use crate::accumulator::SnapshotAccumulator;
use crate::error::SyncError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relsnap_core::{
    CatalogItem, Clock, FetchTimestamp, Snapshot, StalenessPolicy, SyncConfig, SystemClock,
};
use relsnap_gate::{ConcurrencyGate, GateStats, WorkFailure};
use relsnap_github::{FetchError, ReleaseFetcher, ReleaseOutcome, ReleaseProvider};
use std::sync::Arc;

/// A lookup that failed for a reason other than "no release"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Catalog slug
    pub slug: String,
    /// Rendered failure
    pub detail: String,
}

impl From<&WorkFailure> for ItemFailure {
    fn from(failure: &WorkFailure) -> Self {
        Self {
            slug: failure.label.clone(),
            detail: failure.message.clone(),
        }
    }
}

/// Everything a finished engine pass hands to completion
#[derive(Debug)]
pub struct EngineRun {
    /// Entries for every slug of the batch
    pub accumulator: Arc<SnapshotAccumulator>,
    /// Gate counters at idle
    pub stats: GateStats,
    /// Failed lookups, in completion order
    pub failures: Vec<ItemFailure>,
}

/// Orchestrates one synchronization pass
pub struct SyncEngine {
    fetcher: ReleaseFetcher,
    policy: StalenessPolicy,
    max_concurrency: usize,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    /// Create engine using the system clock
    #[must_use]
    pub fn new(fetcher: ReleaseFetcher, policy: StalenessPolicy, max_concurrency: usize) -> Self {
        Self {
            fetcher,
            policy,
            max_concurrency,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create engine from configuration
    #[must_use]
    pub fn from_config(config: &SyncConfig, provider: Arc<dyn ReleaseProvider>) -> Self {
        Self::new(
            ReleaseFetcher::new(provider),
            StalenessPolicy::new(config.release_cache_ttl),
            config.max_concurrency,
        )
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Staleness policy in use
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    /// Current time according to the engine's clock
    #[inline]
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Items a run at `now` would refresh, in catalog order
    #[must_use]
    pub fn stale_items<'a>(
        &self,
        items: &'a [CatalogItem],
        previous: &Snapshot,
        now: DateTime<Utc>,
    ) -> Vec<&'a CatalogItem> {
        items
            .iter()
            .filter(|item| self.policy.is_stale(&item.slug, previous, now))
            .collect()
    }

    /// Run one pass over `items` against `previous`, reading the clock once
    ///
    /// # Errors
    /// See [`SyncEngine::run_at`].
    pub async fn run(
        &self,
        items: &[CatalogItem],
        previous: &Snapshot,
    ) -> Result<EngineRun, SyncError> {
        self.run_at(items, previous, self.clock.now()).await
    }

    /// Run one pass, judging freshness at `now`
    ///
    /// Per-item failures never fail the pass; they are recorded as null
    /// releases and returned in `EngineRun::failures`. Fetch timestamps
    /// still come from the clock as each lookup completes.
    ///
    /// # Errors
    /// `SyncError::DuplicateSlug` if `items` repeats a slug,
    /// `SyncError::Gate` if the gate cannot be created.
    pub async fn run_at(
        &self,
        items: &[CatalogItem],
        previous: &Snapshot,
        now: DateTime<Utc>,
    ) -> Result<EngineRun, SyncError> {
        let accumulator = Arc::new(SnapshotAccumulator::new(
            items.iter().map(|item| item.slug.clone()),
        )?);

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        let gate = ConcurrencyGate::builder(self.max_concurrency)
            .on_work_error(move |failure: &WorkFailure| {
                tracing::error!(
                    slug = %failure.label,
                    panicked = failure.panicked,
                    "{}: {}",
                    failure.label,
                    failure.message
                );
                sink.lock().push(ItemFailure::from(failure));
            })
            .build()?;

        let idle = gate.on_idle();
        {
            let _hold = gate.hold();
            for item in items {
                if let Some(entry) = self.policy.fresh_entry(&item.slug, previous, now) {
                    tracing::debug!(slug = %item.slug, "release data is fresh, carrying over");
                    accumulator.carry_over(&item.slug, entry.clone())?;
                    continue;
                }

                let fetcher = self.fetcher.clone();
                let clock = Arc::clone(&self.clock);
                let accumulator = Arc::clone(&accumulator);
                let item = item.clone();
                // Outcome flows through the accumulator; the submission is not awaited.
                let _pending = gate.submit(item.slug.clone(), move || {
                    refresh(fetcher, clock, accumulator, item)
                });
            }
        }

        let stats = idle.await;
        let failures = std::mem::take(&mut *failures.lock());
        tracing::debug!(
            submitted = stats.submitted,
            failed = stats.failed,
            peak = stats.peak_executing,
            "gate idle"
        );

        Ok(EngineRun {
            accumulator,
            stats,
            failures,
        })
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("policy", &self.policy)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

/// One queued lookup: fetch, record, log
///
/// Returns `Err` only for real failures so that the gate's error hook is
/// the single place they are reported.
async fn refresh(
    fetcher: ReleaseFetcher,
    clock: Arc<dyn Clock>,
    accumulator: Arc<SnapshotAccumulator>,
    item: CatalogItem,
) -> Result<(), FetchError> {
    let outcome = fetcher.fetch_latest_release(&item).await;
    let fetched_at = FetchTimestamp::from_datetime(clock.now());

    if let Err(err) = accumulator.record_fetch(&item.slug, &outcome, fetched_at) {
        tracing::error!(slug = %item.slug, error = %err, "could not record release outcome");
    }

    match outcome {
        ReleaseOutcome::Found(_) => {
            tracing::info!(slug = %item.slug, "{}: got latest release", item.slug);
            Ok(())
        }
        ReleaseOutcome::NotFound => {
            tracing::info!(slug = %item.slug, "{}: no releases found", item.slug);
            Ok(())
        }
        ReleaseOutcome::Error(err) => {
            tracing::info!(slug = %item.slug, "{}: no releases found", item.slug);
            Err(err)
        }
    }
}

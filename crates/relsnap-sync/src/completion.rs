//! Completion handler
//!
//! Runs once per pass after the gate goes idle: waits out the settle
//! delay, assembles the next snapshot and overwrites the store with it.

use crate::accumulator::RecordCounts;
use crate::engine::{EngineRun, ItemFailure};
use crate::error::SyncError;
use crate::store::SnapshotStore;
use relsnap_core::Snapshot;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome counts of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Lookups that returned a release
    pub fetched: usize,
    /// Lookups that found no release
    pub not_found: usize,
    /// Lookups that failed
    pub failed: usize,
    /// Entries reused from the previous snapshot
    pub carried_over: usize,
    /// Failure detail per slug
    pub failures: Vec<ItemFailure>,
    /// Highest number of lookups in flight at once
    pub peak_in_flight: usize,
}

impl SyncReport {
    fn new(counts: RecordCounts, failures: Vec<ItemFailure>, peak_in_flight: usize) -> Self {
        Self {
            fetched: counts.found,
            not_found: counts.not_found,
            failed: counts.failed,
            carried_over: counts.carried_over,
            failures,
            peak_in_flight,
        }
    }

    /// Lookups performed
    #[inline]
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.fetched + self.not_found + self.failed
    }
}

/// A pass that persisted its snapshot
#[derive(Debug, Clone)]
pub struct RunCompleted {
    /// Where the snapshot was written
    pub snapshot_path: PathBuf,
    /// The snapshot that was written
    pub snapshot: Snapshot,
    /// Outcome counts
    pub report: SyncReport,
}

impl RunCompleted {
    /// Number of entries written
    #[inline]
    #[must_use]
    pub fn entries(&self) -> usize {
        self.snapshot.len()
    }
}

/// Persists the next snapshot once all work has settled
#[derive(Debug, Clone)]
pub struct CompletionHandler {
    store: SnapshotStore,
    settle_delay: Duration,
}

impl CompletionHandler {
    /// Handler writing to `store` after `settle_delay`
    #[inline]
    #[must_use]
    pub fn new(store: SnapshotStore, settle_delay: Duration) -> Self {
        Self {
            store,
            settle_delay,
        }
    }

    /// Finish `run`: settle, assemble, persist
    ///
    /// # Errors
    /// `SyncError::Incomplete` if a slug has no entry (nothing is written),
    /// `SyncError::Persist` if the write fails.
    pub async fn complete(&self, run: EngineRun) -> Result<RunCompleted, SyncError> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let (snapshot, counts) = run.accumulator.finish()?;
        self.store.save(&snapshot).await.map_err(SyncError::Persist)?;

        let snapshot_path = self.store.path().to_path_buf();
        tracing::info!(
            entries = snapshot.len(),
            "Done fetching release data. Wrote {}",
            snapshot_path.display()
        );

        Ok(RunCompleted {
            snapshot_path,
            snapshot,
            report: SyncReport::new(counts, run.failures, run.stats.peak_executing),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::SnapshotAccumulator;
    use pretty_assertions::assert_eq;
    use relsnap_core::{FetchTimestamp, ReleaseCacheEntry};
    use relsnap_gate::GateStats;
    use relsnap_github::ReleaseOutcome;
    use std::sync::Arc;

    fn run_with(accumulator: SnapshotAccumulator) -> EngineRun {
        EngineRun {
            accumulator: Arc::new(accumulator),
            stats: GateStats {
                capacity: 4,
                submitted: 1,
                succeeded: 1,
                failed: 0,
                peak_executing: 1,
            },
            failures: Vec::new(),
        }
    }

    fn ts() -> FetchTimestamp {
        FetchTimestamp::parse("2024-05-01T12:00:00.000Z").unwrap()
    }

    #[tokio::test]
    async fn writes_snapshot_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases.json");

        let acc = SnapshotAccumulator::new(["a", "b"]).unwrap();
        acc.record_fetch("a", &ReleaseOutcome::NotFound, ts()).unwrap();
        acc.carry_over("b", ReleaseCacheEntry::fetched(None, ts())).unwrap();

        let handler = CompletionHandler::new(SnapshotStore::new(&path), Duration::ZERO);
        let done = handler.complete(run_with(acc)).await.unwrap();

        assert_eq!(done.snapshot_path, path);
        assert_eq!(done.entries(), 2);
        assert_eq!(done.report.not_found, 1);
        assert_eq!(done.report.carried_over, 1);
        assert_eq!(done.report.lookups(), 1);
        assert_eq!(done.report.peak_in_flight, 1);

        let reloaded = SnapshotStore::new(&path).load().await.unwrap();
        assert_eq!(reloaded, done.snapshot);
    }

    #[tokio::test]
    async fn incomplete_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases.json");

        let acc = SnapshotAccumulator::new(["a", "b"]).unwrap();
        acc.record_fetch("a", &ReleaseOutcome::NotFound, ts()).unwrap();

        let handler = CompletionHandler::new(SnapshotStore::new(&path), Duration::ZERO);
        let err = handler.complete(run_with(acc)).await.unwrap_err();

        assert!(matches!(err, SyncError::Incomplete { ref missing } if missing == &["b".to_string()]));
        assert!(!path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_settle_delay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases.json");
        let handler = CompletionHandler::new(SnapshotStore::new(&path), Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        handler
            .complete(run_with(SnapshotAccumulator::new(Vec::<String>::new()).unwrap()))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}

//! Next-snapshot accumulator
//!
//! Collects exactly one entry per slug of the batch, whether carried over
//! from the previous snapshot or produced by a fetch. Writers run
//! concurrently; `finish` assembles the entries in batch order.

use crate::error::SyncError;
use parking_lot::Mutex;
use relsnap_core::{FetchTimestamp, ReleaseCacheEntry, Snapshot};
use relsnap_github::ReleaseOutcome;
use std::collections::HashMap;

/// How an entry got into the next snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Reused unchanged from the previous snapshot
    CarriedOver,
    /// Fetched, release found
    Found,
    /// Fetched, provider reported no release
    NotFound,
    /// Fetch failed
    Failed,
}

/// Per-kind entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    /// Entries carried over
    pub carried_over: usize,
    /// Fetches that found a release
    pub found: usize,
    /// Fetches that found nothing
    pub not_found: usize,
    /// Fetches that failed
    pub failed: usize,
}

impl RecordCounts {
    /// Entries produced by a fetch
    #[inline]
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.found + self.not_found + self.failed
    }

    /// All entries
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.carried_over + self.fetched()
    }

    fn count(&mut self, kind: RecordKind) {
        match kind {
            RecordKind::CarriedOver => self.carried_over += 1,
            RecordKind::Found => self.found += 1,
            RecordKind::NotFound => self.not_found += 1,
            RecordKind::Failed => self.failed += 1,
        }
    }
}

/// Thread-safe builder of the next snapshot
#[derive(Debug)]
pub struct SnapshotAccumulator {
    order: Vec<String>,
    slots: Mutex<HashMap<String, Option<(ReleaseCacheEntry, RecordKind)>>>,
}

impl SnapshotAccumulator {
    /// Accumulator expecting exactly `slugs`
    ///
    /// # Errors
    /// `SyncError::DuplicateSlug` if a slug repeats.
    pub fn new<I, S>(slugs: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut order = Vec::new();
        let mut slots = HashMap::new();
        for slug in slugs {
            let slug = slug.into();
            if slots.insert(slug.clone(), None).is_some() {
                return Err(SyncError::DuplicateSlug(slug));
            }
            order.push(slug);
        }
        Ok(Self {
            order,
            slots: Mutex::new(slots),
        })
    }

    /// Record a previous entry unchanged
    ///
    /// # Errors
    /// `UnknownSlug` or `AlreadyRecorded`.
    pub fn carry_over(&self, slug: &str, entry: ReleaseCacheEntry) -> Result<(), SyncError> {
        self.insert(slug, entry, RecordKind::CarriedOver)
    }

    /// Record the outcome of a fetch completed at `fetched_at`
    ///
    /// Not-found and failed lookups both record a null release.
    ///
    /// # Errors
    /// `UnknownSlug` or `AlreadyRecorded`.
    pub fn record_fetch(
        &self,
        slug: &str,
        outcome: &ReleaseOutcome,
        fetched_at: FetchTimestamp,
    ) -> Result<RecordKind, SyncError> {
        let kind = match outcome {
            ReleaseOutcome::Found(_) => RecordKind::Found,
            ReleaseOutcome::NotFound => RecordKind::NotFound,
            ReleaseOutcome::Error(_) => RecordKind::Failed,
        };
        let entry = ReleaseCacheEntry::fetched(outcome.release().cloned(), fetched_at);
        self.insert(slug, entry, kind)?;
        Ok(kind)
    }

    fn insert(
        &self,
        slug: &str,
        entry: ReleaseCacheEntry,
        kind: RecordKind,
    ) -> Result<(), SyncError> {
        let mut slots = self.slots.lock();
        match slots.get_mut(slug) {
            None => Err(SyncError::UnknownSlug(slug.to_string())),
            Some(Some(_)) => Err(SyncError::AlreadyRecorded(slug.to_string())),
            Some(slot) => {
                *slot = Some((entry, kind));
                Ok(())
            }
        }
    }

    /// Slugs expected, in batch order
    #[inline]
    #[must_use]
    pub fn expected(&self) -> &[String] {
        &self.order
    }

    /// Number of slugs recorded so far
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.slots.lock().values().filter(|s| s.is_some()).count()
    }

    /// Slugs still without an entry, in batch order
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        let slots = self.slots.lock();
        self.order
            .iter()
            .filter(|slug| matches!(slots.get(slug.as_str()), Some(None)))
            .cloned()
            .collect()
    }

    /// Assemble the next snapshot in batch order
    ///
    /// # Errors
    /// `SyncError::Incomplete` if any slug has no entry.
    pub fn finish(&self) -> Result<(Snapshot, RecordCounts), SyncError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(SyncError::Incomplete { missing });
        }

        let slots = self.slots.lock();
        let mut counts = RecordCounts::default();
        let snapshot = self
            .order
            .iter()
            .filter_map(|slug| {
                let (entry, kind) = slots.get(slug.as_str())?.as_ref()?;
                counts.count(*kind);
                Some((slug.clone(), entry.clone()))
            })
            .collect();
        Ok((snapshot, counts))
    }
}

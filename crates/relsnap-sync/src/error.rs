//! Error types for relsnap sync
//!
//! - Snapshot store I/O and parse failures
//! - Catalog loading failures
//! - Engine and completion failures
//!
//! Per-item fetch failures never show up here; they are recorded as null
//! releases and reported through `SyncReport::failures`.

use relsnap_gate::GateError;
use std::path::PathBuf;

/// Snapshot file errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Snapshot file missing or unreadable
    #[error("failed to read snapshot {}: {source}", .path.display())]
    Read {
        /// Snapshot path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file is not a slug → entry JSON object
    #[error("failed to parse snapshot {}: {source}", .path.display())]
    Parse {
        /// Snapshot path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot could not be rendered
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Snapshot file could not be written
    #[error("failed to write snapshot {}: {source}", .path.display())]
    Write {
        /// Snapshot path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Catalog loading errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Catalog file missing or unreadable
    #[error("failed to read catalog {}: {source}", .path.display())]
    Read {
        /// Catalog path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is not a JSON array of apps
    #[error("failed to parse catalog {}: {source}", .path.display())]
    Parse {
        /// Catalog path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// App without a slug
    #[error("catalog entry {index} has an empty slug")]
    EmptySlug {
        /// Position in the catalog
        index: usize,
    },

    /// Two apps share a slug
    #[error("duplicate slug in catalog: {0}")]
    DuplicateSlug(String),
}

/// Synchronization errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Previous snapshot unreadable; nothing was scheduled
    #[error("fatal startup error: {0}")]
    FatalStartup(#[source] StoreError),

    /// Concurrency gate could not be created
    #[error("concurrency gate error: {0}")]
    Gate(#[from] GateError),

    /// The same slug was handed to the engine twice
    #[error("duplicate slug in sync batch: {0}")]
    DuplicateSlug(String),

    /// A slug was written to the accumulator twice
    #[error("slug {0} recorded twice")]
    AlreadyRecorded(String),

    /// A slug outside the batch was written to the accumulator
    #[error("slug {0} is not part of this run")]
    UnknownSlug(String),

    /// Some slugs never received an entry
    #[error("snapshot incomplete, missing {} slug(s): {missing:?}", .missing.len())]
    Incomplete {
        /// Slugs without an entry
        missing: Vec<String>,
    },

    /// Next snapshot could not be written
    #[error("failed to persist snapshot: {0}")]
    Persist(#[source] StoreError),
}

impl SyncError {
    /// Whether the run aborted before any work was scheduled
    #[inline]
    #[must_use]
    pub fn is_fatal_startup(&self) -> bool {
        matches!(self, Self::FatalStartup(_))
    }
}

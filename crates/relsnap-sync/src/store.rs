//! Snapshot store
//!
//! Reads the previous snapshot at startup and overwrites it at completion.
//! The write goes straight to the target path; an interrupted write leaves
//! a truncated file behind.

use crate::error::StoreError;
use relsnap_core::Snapshot;
use std::path::{Path, PathBuf};

/// JSON file holding one snapshot
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store backed by `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot
    ///
    /// # Errors
    /// `StoreError::Read` if the file is missing or unreadable,
    /// `StoreError::Parse` if it is not a slug → entry object.
    pub async fn load(&self) -> Result<Snapshot, StoreError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?;

        let snapshot = Snapshot::from_json(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(path = %self.path.display(), entries = snapshot.len(), "loaded snapshot");
        Ok(snapshot)
    }

    /// Overwrite the file with `snapshot` as pretty-printed JSON
    ///
    /// # Errors
    /// `StoreError::Serialize` or `StoreError::Write`.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut json = snapshot.to_pretty_json().map_err(StoreError::Serialize)?;
        json.push('\n');

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), entries = snapshot.len(), "wrote snapshot");
        Ok(())
    }
}

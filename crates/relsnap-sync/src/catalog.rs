//! App catalog
//!
//! A JSON array of apps, each with a `slug` and an optional `repository`.
//! Only apps whose repository parses as a GitHub locator take part in a
//! sync; everything else is ignored without a diagnostic.

use crate::error::CatalogError;
use relsnap_core::{CatalogItem, RepositoryLocator};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One catalog record
///
/// Unknown fields are accepted and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogApp {
    /// Unique app identifier
    pub slug: String,
    /// Source repository, in any supported form
    #[serde(default)]
    pub repository: Option<String>,
}

impl CatalogApp {
    /// Create app record
    #[must_use]
    pub fn new(slug: impl Into<String>, repository: Option<&str>) -> Self {
        Self {
            slug: slug.into(),
            repository: repository.map(str::to_string),
        }
    }

    /// Sync item for this app, if its repository is on GitHub
    #[must_use]
    pub fn github_item(&self) -> Option<CatalogItem> {
        let repository = self.repository.as_deref()?;
        RepositoryLocator::parse(repository)
            .ok()
            .map(|_| CatalogItem::new(self.slug.clone(), repository))
    }
}

/// Validated app catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    apps: Vec<CatalogApp>,
}

impl Catalog {
    /// Read and validate a catalog file
    ///
    /// # Errors
    /// Read, parse and validation failures; see `CatalogError`.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let apps: Vec<CatalogApp> =
            serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_apps(apps)
    }

    /// Validate an in-memory catalog
    ///
    /// # Errors
    /// `CatalogError::EmptySlug` or `CatalogError::DuplicateSlug`.
    pub fn from_apps(apps: Vec<CatalogApp>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(apps.len());
        for (index, app) in apps.iter().enumerate() {
            if app.slug.trim().is_empty() {
                return Err(CatalogError::EmptySlug { index });
            }
            if !seen.insert(app.slug.as_str()) {
                return Err(CatalogError::DuplicateSlug(app.slug.clone()));
            }
        }
        Ok(Self { apps })
    }

    /// Number of apps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Whether the catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Sync items for apps hosted on GitHub, in catalog order
    #[must_use]
    pub fn with_github_repos(&self) -> Vec<CatalogItem> {
        self.apps.iter().filter_map(CatalogApp::github_item).collect()
    }
}

//! GitHub repository locator parsing
//!
//! Accepts the forms app catalogs tend to contain:
//! - `https://github.com/owner/repo` (also `http://`, `git+https://`, `git://`, `ssh://`)
//! - `git@github.com:owner/repo.git`
//! - `github.com/owner/repo`
//! - `owner/repo`
//!
//! Trailing path segments (`/tree/main`, `/releases`), `?query`, `#fragment`
//! and a `.git` suffix are ignored.

use crate::error::LocatorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Owner and repository name of a GitHub-hosted project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryLocator {
    owner: String,
    name: String,
}

impl RepositoryLocator {
    /// Create locator from already-validated parts
    ///
    /// # Errors
    /// `InvalidCharacters` if either part is not a valid GitHub name.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, LocatorError> {
        let owner = owner.into();
        let name = name.into();
        if !valid_owner(&owner) || !valid_name(&name) {
            return Err(LocatorError::InvalidCharacters(format!("{owner}/{name}")));
        }
        Ok(Self { owner, name })
    }

    /// Parse any supported locator form
    ///
    /// # Errors
    /// Returns `LocatorError` describing why the locator was rejected.
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LocatorError::Empty);
        }
        let locator = trimmed.strip_prefix("git+").unwrap_or(trimmed);

        let segments = if locator.contains("://") {
            url_segments(locator)?
        } else if let Some(rest) = locator.strip_prefix("git@") {
            scp_segments(rest, trimmed)?
        } else if locator.split('/').next().is_some_and(|host| host.contains('.')) {
            url_segments(&format!("https://{locator}"))?
        } else {
            // `owner/repo` shorthand
            let path = strip_query(locator);
            if path.matches('/').count() != 1 {
                return Err(LocatorError::MissingSegments(trimmed.to_string()));
            }
            path_segments(path)
        };

        let [owner, name, ..] = segments.as_slice() else {
            return Err(LocatorError::MissingSegments(trimmed.to_string()));
        };
        let name = name.strip_suffix(".git").unwrap_or(name.as_str());

        Self::new(owner.as_str(), name)
    }

    /// Repository owner (user or organization)
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepositoryLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Owner/repo segments of any `scheme://` locator
fn url_segments(locator: &str) -> Result<Vec<String>, LocatorError> {
    let url = Url::parse(locator).map_err(|source| LocatorError::InvalidUrl {
        input: locator.to_string(),
        source,
    })?;
    ensure_github(url.host_str().unwrap_or_default())?;

    Ok(url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

/// `git@host:owner/repo` has no scheme, so `Url` cannot take it
fn scp_segments(rest: &str, original: &str) -> Result<Vec<String>, LocatorError> {
    let (host, path) = rest
        .split_once(':')
        .ok_or_else(|| LocatorError::MissingSegments(original.to_string()))?;
    ensure_github(host)?;
    Ok(path_segments(strip_query(path)))
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or_default()
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn ensure_github(host: &str) -> Result<(), LocatorError> {
    if GITHUB_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) {
        Ok(())
    } else {
        Err(LocatorError::UnsupportedHost(host.to_string()))
    }
}

fn valid_owner(owner: &str) -> bool {
    !owner.is_empty() && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

//! Snapshot coverage check
//!
//! Every catalog app with a GitHub repository must have an entry carrying a
//! fetch timestamp.

use relsnap_core::{CatalogItem, Snapshot};
use std::collections::HashSet;

/// Result of checking a snapshot against the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Catalog items checked
    pub expected: usize,
    /// Items without an entry
    pub missing: Vec<String>,
    /// Items whose entry has no fetch timestamp
    pub unfetched: Vec<String>,
    /// Items whose entry records a release
    pub with_release: usize,
    /// Snapshot keys that are not catalog items
    pub extra: Vec<String>,
}

impl CoverageReport {
    /// Whether every item has a fetched entry
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unfetched.is_empty()
    }
}

/// Check `snapshot` against `items`
#[must_use]
pub fn verify_coverage(items: &[CatalogItem], snapshot: &Snapshot) -> CoverageReport {
    let mut report = CoverageReport {
        expected: items.len(),
        ..CoverageReport::default()
    };

    for item in items {
        match snapshot.get(&item.slug) {
            None => report.missing.push(item.slug.clone()),
            Some(entry) => {
                if entry.latest_release_fetched_at.is_none() {
                    report.unfetched.push(item.slug.clone());
                }
                if entry.has_release() {
                    report.with_release += 1;
                }
            }
        }
    }

    let known: HashSet<&str> = items.iter().map(|item| item.slug.as_str()).collect();
    report.extra = snapshot
        .slugs()
        .filter(|slug| !known.contains(slug))
        .map(str::to_string)
        .collect();

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relsnap_core::ReleaseCacheEntry;
    use relsnap_test_utils::{cached_entry, catalog, hours_ago, release_json, snapshot};

    #[test]
    fn complete_snapshot_passes() {
        let snap = snapshot([
            ("a", cached_entry(Some(release_json("v1")), hours_ago(1))),
            ("b", cached_entry(None, hours_ago(2))),
        ]);
        let report = verify_coverage(&catalog(&["a", "b"]), &snap);

        assert!(report.is_complete());
        assert_eq!(report.expected, 2);
        assert_eq!(report.with_release, 1);
        assert!(report.extra.is_empty());
    }

    #[test]
    fn reports_gaps_and_extras() {
        let unfetched = ReleaseCacheEntry::new(None, None);
        let snap = snapshot([
            ("a", unfetched),
            ("retired", cached_entry(None, hours_ago(30))),
        ]);
        let report = verify_coverage(&catalog(&["a", "b"]), &snap);

        assert!(!report.is_complete());
        assert_eq!(report.missing, vec!["b".to_string()]);
        assert_eq!(report.unfetched, vec!["a".to_string()]);
        assert_eq!(report.extra, vec!["retired".to_string()]);
    }
}

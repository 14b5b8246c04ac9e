//! Snapshot data model
//!
//! Defines what gets persisted between runs:
//! - `CatalogItem`: one app with a GitHub repository, as produced by the catalog
//! - `ReleaseData`: the provider's release payload, kept verbatim
//! - `ReleaseCacheEntry`: last known outcome for one slug
//! - `Snapshot`: slug → entry mapping, read once and written once per run

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Catalog entry eligible for release synchronization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Stable unique identifier
    pub slug: String,
    /// Opaque repository locator (e.g. `https://github.com/owner/repo`)
    pub repository_locator: String,
}

impl CatalogItem {
    /// Create new catalog item
    #[inline]
    #[must_use]
    pub fn new(slug: impl Into<String>, repository_locator: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            repository_locator: repository_locator.into(),
        }
    }
}

/// Release metadata as returned by the provider
///
/// The JSON body is stored untouched so that a carried-over entry
/// serializes back to the same bytes it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseData(Value);

impl ReleaseData {
    /// Wrap a provider payload
    #[inline]
    #[must_use]
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    /// Release tag, e.g. `v1.2.0`
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        self.0.get("tag_name").and_then(Value::as_str)
    }

    /// Raw payload
    #[inline]
    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Consume into the raw payload
    #[inline]
    #[must_use]
    pub fn into_json(self) -> Value {
        self.0
    }
}

/// Moment an entry was last fetched
///
/// Serialized as an ISO-8601 UTC string with millisecond precision
/// (`2024-05-01T12:00:00.000Z`). The text read from disk is retained and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTimestamp {
    instant: DateTime<Utc>,
    text: String,
}

impl FetchTimestamp {
    /// Timestamp for `instant`, truncated to whole milliseconds
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        let text = instant.to_rfc3339_opts(SecondsFormat::Millis, true);
        let millis = instant.timestamp_millis();
        let instant = DateTime::from_timestamp_millis(millis).unwrap_or(instant);
        Self { instant, text }
    }

    /// Parse an ISO-8601 / RFC 3339 timestamp
    ///
    /// # Errors
    /// Returns the chrono parse error if `text` is not RFC 3339.
    pub fn parse(text: &str) -> Result<Self, chrono::ParseError> {
        let instant = DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc);
        Ok(Self {
            instant,
            text: text.to_string(),
        })
    }

    /// Parsed instant
    #[inline]
    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Serialized form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for FetchTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for FetchTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for FetchTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

const LATEST_RELEASE: &str = "latestRelease";
const FETCHED_AT: &str = "latestReleaseFetchedAt";

/// Last known release outcome for one slug
///
/// `latest_release == None` means the slug was checked and no release is
/// known (none published, or the lookup failed), not that it was never
/// checked.
///
/// An entry read from disk remembers its JSON object. Keys other than the
/// two typed fields, and the order of all keys, are written back as read.
#[derive(Debug, Clone)]
pub struct ReleaseCacheEntry {
    /// Release payload, if any
    pub latest_release: Option<ReleaseData>,
    /// When the lookup completed
    pub latest_release_fetched_at: Option<FetchTimestamp>,
    source: Option<Map<String, Value>>,
}

impl ReleaseCacheEntry {
    /// Entry built in memory, with no on-disk object behind it
    #[inline]
    #[must_use]
    pub fn new(release: Option<ReleaseData>, fetched_at: Option<FetchTimestamp>) -> Self {
        Self {
            latest_release: release,
            latest_release_fetched_at: fetched_at,
            source: None,
        }
    }

    /// Entry for a completed lookup
    #[inline]
    #[must_use]
    pub fn fetched(release: Option<ReleaseData>, fetched_at: FetchTimestamp) -> Self {
        Self::new(release, Some(fetched_at))
    }

    /// Whether a release is recorded
    #[inline]
    #[must_use]
    pub fn has_release(&self) -> bool {
        self.latest_release.is_some()
    }

    /// JSON object this entry serializes to
    ///
    /// Typed fields overwrite their keys in place; a key absent from the
    /// source object is only added when the field holds a value.
    fn to_object(&self) -> Map<String, Value> {
        let mut object = self.source.clone().unwrap_or_default();
        let built = self.source.is_none();

        if built || self.latest_release.is_some() || object.contains_key(LATEST_RELEASE) {
            let release = self
                .latest_release
                .as_ref()
                .map_or(Value::Null, |r| r.as_json().clone());
            object.insert(LATEST_RELEASE.to_string(), release);
        }
        if built || self.latest_release_fetched_at.is_some() || object.contains_key(FETCHED_AT) {
            let fetched_at = self
                .latest_release_fetched_at
                .as_ref()
                .map_or(Value::Null, |t| Value::String(t.as_str().to_string()));
            object.insert(FETCHED_AT.to_string(), fetched_at);
        }
        object
    }
}

impl PartialEq for ReleaseCacheEntry {
    fn eq(&self, other: &Self) -> bool {
        self.to_object() == other.to_object()
    }
}

impl Serialize for ReleaseCacheEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReleaseCacheEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let object = Map::<String, Value>::deserialize(deserializer)?;

        let latest_release = match object.get(LATEST_RELEASE) {
            None | Some(Value::Null) => None,
            Some(body) => Some(ReleaseData::new(body.clone())),
        };
        let latest_release_fetched_at = match object.get(FETCHED_AT) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => {
                Some(FetchTimestamp::parse(text).map_err(D::Error::custom)?)
            }
            Some(other) => {
                return Err(D::Error::invalid_type(
                    unexpected(other),
                    &"an RFC 3339 timestamp string",
                ))
            }
        };

        Ok(Self {
            latest_release,
            latest_release_fetched_at,
            source: Some(object),
        })
    }
}

fn unexpected(value: &Value) -> serde::de::Unexpected<'_> {
    use serde::de::Unexpected;
    match value {
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
        Value::String(s) => Unexpected::Str(s),
        Value::Null => Unexpected::Unit,
    }
}

/// Persisted slug → entry mapping
///
/// Keys keep insertion order so written files diff cleanly between runs.
/// A `null` value on disk is accepted and treated as "no entry".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: IndexMap<String, Option<ReleaseCacheEntry>>,
}

impl Snapshot {
    /// Create empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse snapshot JSON
    ///
    /// # Errors
    /// Returns the serde error when the document is not a slug → entry object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Pretty-printed JSON (two-space indent)
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Entry for `slug`
    #[inline]
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&ReleaseCacheEntry> {
        self.entries.get(slug).and_then(Option::as_ref)
    }

    /// Whether a non-null entry exists for `slug`
    #[inline]
    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    /// Number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate non-null entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReleaseCacheEntry)> {
        self.entries
            .iter()
            .filter_map(|(slug, entry)| entry.as_ref().map(|e| (slug.as_str(), e)))
    }

    /// Iterate keys in order
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<(String, ReleaseCacheEntry)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, ReleaseCacheEntry)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(slug, entry)| (slug, Some(entry)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SAMPLE: &str = r#"{
  "hyper": {
    "latestRelease": {
      "tag_name": "v3.0.0",
      "html_url": "https://github.com/vercel/hyper/releases/tag/v3.0.0",
      "id": 1234
    },
    "latestReleaseFetchedAt": "2024-05-01T12:00:00.000Z"
  },
  "abricotine": {
    "latestRelease": null,
    "latestReleaseFetchedAt": "2024-05-01T12:00:01.250Z"
  }
}"#;

    #[test]
    fn snapshot_round_trips_byte_for_byte() {
        let snapshot = Snapshot::from_json(SAMPLE).unwrap();
        assert_eq!(snapshot.to_pretty_json().unwrap(), SAMPLE);
    }

    #[test]
    fn snapshot_accessors() {
        let snapshot = Snapshot::from_json(SAMPLE).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.slugs().collect::<Vec<_>>(), vec!["hyper", "abricotine"]);

        let hyper = snapshot.get("hyper").unwrap();
        assert!(hyper.has_release());
        assert_eq!(hyper.latest_release.as_ref().unwrap().tag_name(), Some("v3.0.0"));
        assert!(!snapshot.get("abricotine").unwrap().has_release());
        assert!(snapshot.get("missing").is_none());
    }

    #[test]
    fn null_entry_is_treated_as_absent() {
        let snapshot = Snapshot::from_json(r#"{ "ghost": null }"#).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains("ghost"));
        assert_eq!(snapshot.iter().count(), 0);
    }

    #[test]
    fn missing_timestamp_deserializes_as_none() {
        let snapshot = Snapshot::from_json(r#"{ "old": { "latestRelease": null } }"#).unwrap();
        assert!(snapshot.get("old").unwrap().latest_release_fetched_at.is_none());
    }

    #[test]
    fn malformed_snapshot_is_rejected() {
        assert!(Snapshot::from_json("[]").is_err());
        assert!(Snapshot::from_json(r#"{ "x": { "latestReleaseFetchedAt": "yesterday" } }"#).is_err());
        assert!(Snapshot::from_json("{").is_err());
    }

    #[test]
    fn fetch_timestamp_truncates_to_millis() {
        let instant = Utc.timestamp_opt(1_714_564_800, 123_456_789).unwrap();
        let ts = FetchTimestamp::from_datetime(instant);
        assert_eq!(ts.as_str(), "2024-05-01T12:00:00.123Z");
        assert_eq!(ts.instant().timestamp_subsec_nanos(), 123_000_000);

        let reparsed = FetchTimestamp::parse(ts.as_str()).unwrap();
        assert_eq!(reparsed, ts);
    }

    #[test]
    fn fetch_timestamp_keeps_source_text() {
        let ts = FetchTimestamp::parse("2024-05-01T14:00:00+02:00").unwrap();
        assert_eq!(ts.as_str(), "2024-05-01T14:00:00+02:00");
        assert_eq!(ts.instant(), Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn release_data_accessors() {
        let body = json!({ "tag_name": "1.0.0", "draft": false });
        let data = ReleaseData::new(body.clone());
        assert_eq!(data.tag_name(), Some("1.0.0"));
        assert_eq!(data.as_json(), &body);
        assert!(ReleaseData::new(json!({})).tag_name().is_none());
    }

    #[test]
    fn entry_keeps_unknown_keys_and_key_order() {
        let text = r#"{
  "hyper": {
    "latestReleaseFetchedAt": "2024-05-01T12:00:00.000Z",
    "pinned": true,
    "latestRelease": {
      "tag_name": "v3.0.0"
    }
  },
  "legacy": {
    "note": "moved",
    "latestReleaseFetchedAt": null
  }
}"#;
        let snapshot = Snapshot::from_json(text).unwrap();
        let legacy = snapshot.get("legacy").unwrap();
        assert!(legacy.latest_release.is_none());
        assert!(legacy.latest_release_fetched_at.is_none());
        assert_eq!(snapshot.to_pretty_json().unwrap(), text);
    }

    #[test]
    fn typed_fields_overwrite_in_place() {
        let mut entry: ReleaseCacheEntry = serde_json::from_value(json!({
            "latestReleaseFetchedAt": "2024-05-01T12:00:00.000Z",
            "extra": [1, 2],
            "latestRelease": null
        }))
        .unwrap();
        entry.latest_release = Some(ReleaseData::new(json!({ "tag_name": "v2" })));

        let written = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            written,
            r#"{"latestReleaseFetchedAt":"2024-05-01T12:00:00.000Z","extra":[1,2],"latestRelease":{"tag_name":"v2"}}"#
        );
    }

    #[test]
    fn non_string_timestamp_is_rejected() {
        assert!(Snapshot::from_json(r#"{ "x": { "latestReleaseFetchedAt": 17 } }"#).is_err());
        assert!(Snapshot::from_json(r#"{ "x": "not an entry" }"#).is_err());
    }

    #[test]
    fn fetched_entry_serializes_camel_case() {
        let at = FetchTimestamp::from_datetime(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let entry = ReleaseCacheEntry::fetched(None, at);
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({ "latestRelease": null, "latestReleaseFetchedAt": "2024-05-01T00:00:00.000Z" })
        );
    }
}

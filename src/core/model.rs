// LogScope - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no backend
// dependencies. Everything here is created fresh per request and discarded
// at request end.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// =============================================================================
// Time range
// =============================================================================

/// Inclusive time window applied to the timestamp field.
///
/// Both bounds are canonical UTC strings without a zone suffix, as produced
/// by `core::time::normalize`. `None` means unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

// =============================================================================
// Filter values
// =============================================================================

/// A filter value after ingestion: exactly one value, or several distinct ones.
///
/// Construct through `FilterValue::from_values` so that empty strings are
/// dropped, duplicates collapse, and a one-element list becomes `Single`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Multi(Vec<String>),
}

impl FilterValue {
    /// Normalise raw values into a filter value.
    ///
    /// Blank values are dropped and duplicates removed (first occurrence
    /// keeps its position). Returns `None` when nothing is left.
    pub fn from_values<I, S>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if value.trim().is_empty() || kept.contains(&value) {
                continue;
            }
            kept.push(value);
        }
        match kept.len() {
            0 => None,
            1 => kept.pop().map(FilterValue::Single),
            _ => Some(FilterValue::Multi(kept)),
        }
    }

    /// Borrow the values in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FilterValue::Single(v) => vec![v.as_str()],
            FilterValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Boundary shape of a filter value: a bare string or a list of strings.
///
/// Only used for deserialisation; converted into `FilterValue` on ingress.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFilterValue {
    One(String),
    Many(Vec<String>),
}

impl RawFilterValue {
    fn into_filter_value(self) -> Option<FilterValue> {
        match self {
            RawFilterValue::One(v) => FilterValue::from_values([v]),
            RawFilterValue::Many(vs) => FilterValue::from_values(vs),
        }
    }
}

/// Field name → filter value, iterated in sorted key order.
///
/// Keys are case-sensitive field names. A key is only ever present with a
/// non-empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, RawFilterValue>")]
pub struct Filters(BTreeMap<String, FilterValue>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`.
    ///
    /// The value is normalised like `FilterValue::from_values`; when no
    /// non-blank value remains the key is left untouched.
    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        if let Some(value) = FilterValue::from_values(value.values()) {
            self.0.insert(key, value);
        }
    }

    /// Insert raw values for `key`, dropping the key if nothing valid remains.
    pub fn insert_values<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(value) = FilterValue::from_values(values) {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, RawFilterValue>> for Filters {
    fn from(raw: BTreeMap<String, RawFilterValue>) -> Self {
        let mut filters = Filters::new();
        for (key, value) in raw {
            if let Some(value) = value.into_filter_value() {
                filters.insert(key, value);
            }
        }
        filters
    }
}

impl FromIterator<(String, FilterValue)> for Filters {
    fn from_iter<T: IntoIterator<Item = (String, FilterValue)>>(iter: T) -> Self {
        let mut filters = Filters::new();
        for (key, value) in iter {
            filters.insert(key, value);
        }
        filters
    }
}

// =============================================================================
// Presets
// =============================================================================

/// A stored default filter: one key and the values it allows.
///
/// Owned by the config store; the core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: i64,
    pub key: String,
    /// Display label. Falls back to `key` when empty.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Preset {
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

// =============================================================================
// Stored connections
// =============================================================================

/// A named backend connection kept in the config store.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// =============================================================================
// Clauses
// =============================================================================

/// One conjunct of the assembled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Free-text query in the backend's query-string syntax.
    Text(String),
    /// Time window on the timestamp field.
    TimeRange(TimeRange),
    /// Exact phrase match of one field against one value.
    Phrase { key: String, value: String },
    /// Phrase match of one field against any of several values.
    AnyOf { key: String, values: Vec<String> },
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of one scroll export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// Lines written to the sink.
    pub count: usize,
    /// True when the export stopped because `count` reached the requested cap.
    pub truncated: bool,
}

/// A local export artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// File name, used as the artifact identifier by download/preview.
    pub name: String,
    /// Absolute location on disk.
    pub path: PathBuf,
}

/// Outcome of a suggestion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Field actually used for bucketing (may carry a `.keyword` suffix).
    pub field: String,
    /// Distinct non-empty values, most frequent first.
    pub values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_drops_blanks_and_duplicates() {
        let v = FilterValue::from_values(["a", "", "b", "a", "  "]).unwrap();
        assert_eq!(v, FilterValue::Multi(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_single_element_list_becomes_single() {
        let v = FilterValue::from_values(vec!["", "only"]).unwrap();
        assert_eq!(v, FilterValue::Single("only".into()));
    }

    #[test]
    fn test_empty_list_yields_none() {
        assert!(FilterValue::from_values(Vec::<String>::new()).is_none());
        assert!(FilterValue::from_values([""]).is_none());
    }

    #[test]
    fn test_filters_deserialise_from_mixed_shapes() {
        let filters: Filters = serde_json::from_str(
            r#"{"a": "x", "b": ["y", "z"], "c": "", "d": [], "e": ["w", ""]}"#,
        )
        .unwrap();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters.get("a"), Some(&FilterValue::Single("x".into())));
        assert_eq!(
            filters.get("b"),
            Some(&FilterValue::Multi(vec!["y".into(), "z".into()]))
        );
        assert_eq!(filters.get("e"), Some(&FilterValue::Single("w".into())));
        assert!(!filters.contains_key("c"));
        assert!(!filters.contains_key("d"));
    }

    #[test]
    fn test_insert_normalises_hand_built_values() {
        let mut filters = Filters::new();
        filters.insert("a", FilterValue::Single(String::new()));
        filters.insert("b", FilterValue::Multi(vec!["".into(), " ".into()]));
        filters.insert("c", FilterValue::Multi(Vec::new()));
        filters.insert("d", FilterValue::Multi(vec!["x".into(), "".into(), "x".into()]));
        filters.insert("", FilterValue::Single("x".into()));
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.get("d"), Some(&FilterValue::Single("x".into())));

        let collected: Filters = vec![
            ("e".to_string(), FilterValue::Single("  ".into())),
            ("f".to_string(), FilterValue::Multi(vec!["y".into(), "z".into()])),
        ]
        .into_iter()
        .collect();
        assert_eq!(collected.len(), 1);
        assert!(!collected.contains_key("e"));
    }

    #[test]
    fn test_filters_iterate_in_key_order() {
        let mut filters = Filters::new();
        filters.insert_values("zeta", ["1"]);
        filters.insert_values("Alpha", ["2"]);
        filters.insert_values("alpha", ["3"]);
        let keys: Vec<&str> = filters.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Alpha", "alpha", "zeta"]);
    }

    #[test]
    fn test_preset_label_falls_back_to_key() {
        let preset = Preset {
            id: 1,
            key: "container.labels.service_project".into(),
            label: String::new(),
            values: vec![],
        };
        assert_eq!(preset.display_label(), "container.labels.service_project");
    }

    #[test]
    fn test_time_range_serialises_only_present_bounds() {
        let range = TimeRange {
            gte: Some("2024-01-01T00:00:00".into()),
            lte: None,
        };
        assert_eq!(
            serde_json::to_string(&range).unwrap(),
            r#"{"gte":"2024-01-01T00:00:00"}"#
        );
    }
}

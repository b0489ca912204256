// LogScope - core/filter.rs
//
// Merges a stored preset with request filters and turns the result into
// query clauses. All clauses are AND-combined by the backend query.
// Core layer: pure logic, no I/O.

use crate::core::model::{Clause, FilterValue, Filters, Preset};
use crate::util::constants::KEYWORD_SUFFIX;

/// Merge an optional preset with the explicit request filters.
///
/// The preset seeds `{preset.key: preset.values}`. Every key present in
/// `explicit` then replaces whatever the preset put there; values for the
/// same key are never unioned. Keys that end up without a value are absent.
pub fn build(explicit: &Filters, preset: Option<&Preset>) -> Filters {
    let mut merged = Filters::new();

    if let Some(preset) = preset {
        merged.insert_values(preset.key.clone(), preset.values.iter().cloned());
    }

    for (key, value) in explicit.iter() {
        merged.insert(key.clone(), value.clone());
    }

    merged
}

/// One clause per key: `Phrase` for a single value, `AnyOf` for several.
///
/// Clauses come out in the filters' sorted key order.
pub fn to_clauses(merged: &Filters) -> Vec<Clause> {
    merged
        .iter()
        .filter_map(|(key, value)| match value {
            FilterValue::Single(v) => Some(Clause::Phrase {
                key: key.clone(),
                value: v.clone(),
            }),
            FilterValue::Multi(vs) => match vs.as_slice() {
                [] => None,
                [only] => Some(Clause::Phrase {
                    key: key.clone(),
                    value: only.clone(),
                }),
                _ => Some(Clause::AnyOf {
                    key: key.clone(),
                    values: vs.clone(),
                }),
            },
        })
        .collect()
}

/// Drop the filter on `field` and on its `.keyword` sibling (or base field
/// when `field` is itself the keyword variant), so a suggestion for a field
/// is not narrowed by a filter on that same field.
pub fn without_field(filters: &Filters, field: &str) -> Filters {
    let base = field.strip_suffix(KEYWORD_SUFFIX).unwrap_or(field);
    let keyword = format!("{base}{KEYWORD_SUFFIX}");

    filters
        .iter()
        .filter(|(key, _)| key.as_str() != base && key.as_str() != keyword)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

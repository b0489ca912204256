// LogScope - core/query.rs
//
// Assembles the clause conjunction and renders it into the backend query DSL.
//
//   Text      -> bool.must    query_string
//   TimeRange -> bool.filter  range on the timestamp field
//   Phrase    -> bool.filter  match_phrase
//   AnyOf     -> bool.filter  bool.should of match_phrase, at least one

use crate::core::model::{Clause, TimeRange};
use crate::util::constants::{MESSAGE_FIELD, SUGGEST_AGGREGATION_NAME, TIMESTAMP_FIELD};
use crate::util::error::TransportError;
use serde_json::{json, Value};

/// The full query for one request: an AND of all clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledQuery {
    clauses: Vec<Clause>,
}

impl AssembledQuery {
    /// `text` AND `range` AND every filter clause.
    pub fn new(text: &str, range: TimeRange, filters: Vec<Clause>) -> Self {
        let mut clauses = Vec::with_capacity(filters.len() + 2);
        clauses.push(Clause::Text(text.to_string()));
        clauses.push(Clause::TimeRange(range));
        clauses.extend(filters);
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The `bool` query shared by the export and suggestion bodies.
    pub fn to_bool_query(&self) -> Value {
        let mut must = Vec::new();
        let mut filter = Vec::new();
        for clause in &self.clauses {
            match clause {
                Clause::Text(q) => must.push(json!({ "query_string": { "query": q } })),
                other => filter.push(filter_clause(other)),
            }
        }
        json!({ "bool": { "must": must, "filter": filter } })
    }

    /// Body of the scroll search: only the message field, oldest first.
    pub fn to_export_body(&self) -> Value {
        json!({
            "query": self.to_bool_query(),
            "_source": [MESSAGE_FIELD],
            "sort": [{ TIMESTAMP_FIELD: { "order": "asc" } }],
        })
    }

    /// Body of the suggestion search: no hits, one terms aggregation over
    /// `field` with at most `size` buckets, most frequent first.
    pub fn to_terms_body(&self, field: &str, size: usize) -> Value {
        json!({
            "size": 0,
            "query": self.to_bool_query(),
            "aggs": {
                SUGGEST_AGGREGATION_NAME: {
                    "terms": {
                        "field": field,
                        "size": size,
                        "order": { "_count": "desc" },
                    }
                }
            }
        })
    }
}

fn filter_clause(clause: &Clause) -> Value {
    match clause {
        Clause::Text(q) => json!({ "query_string": { "query": q } }),
        Clause::TimeRange(range) => json!({ "range": { TIMESTAMP_FIELD: range } }),
        Clause::Phrase { key, value } => json!({ "match_phrase": { key.as_str(): value } }),
        Clause::AnyOf { key, values } => {
            let should: Vec<Value> = values
                .iter()
                .map(|v| json!({ "match_phrase": { key.as_str(): v } }))
                .collect();
            json!({ "bool": { "should": should, "minimum_should_match": 1 } })
        }
    }
}

/// Extract bucket keys from a terms-aggregation response, most frequent first.
///
/// Non-string keys use `key_as_string` when present, else their JSON text.
/// Empty keys are skipped.
pub fn term_values(response: &Value) -> Result<Vec<String>, TransportError> {
    let buckets = response
        .pointer(&format!("/aggregations/{SUGGEST_AGGREGATION_NAME}/buckets"))
        .and_then(Value::as_array)
        .ok_or_else(|| TransportError::Malformed {
            operation: "terms aggregation",
            reason: "missing aggregations.values.buckets".to_string(),
        })?;

    let mut counted: Vec<(u64, String)> = buckets
        .iter()
        .filter_map(|bucket| {
            let key = match (bucket.get("key_as_string"), bucket.get("key")) {
                (Some(Value::String(s)), _) => s.clone(),
                (_, Some(Value::String(s))) => s.clone(),
                (_, Some(Value::Null)) | (_, None) => return None,
                (_, Some(other)) => other.to_string(),
            };
            if key.trim().is_empty() {
                return None;
            }
            let count = bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0);
            Some((count, key))
        })
        .collect();

    // Stable: equal counts keep the backend's order.
    counted.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(counted.into_iter().map(|(_, key)| key).collect())
}

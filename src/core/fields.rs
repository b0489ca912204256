// LogScope - core/fields.rs
//
// Picks the field variant that supports exact-value bucketing.
// Text fields indexed with dynamic mappings usually carry a `.keyword`
// sub-field; that is the one a terms aggregation must target.

use crate::core::backend::{FieldCaps, SearchBackend};
use crate::util::constants::KEYWORD_SUFFIX;

/// Candidate field names in preference order.
pub fn candidates(field: &str) -> Vec<String> {
    let mut out = vec![field.to_string()];
    if !field.ends_with(KEYWORD_SUFFIX) {
        out.push(format!("{field}{KEYWORD_SUFFIX}"));
    }
    out
}

/// Return the first candidate reported aggregatable by any of its mappings.
///
/// Never fails: a lookup error or a field with no aggregatable variant yields
/// the last candidate as a best-effort guess.
pub async fn resolve_aggregatable(backend: &dyn SearchBackend, index: &str, field: &str) -> String {
    let candidates = candidates(field);
    let fallback = candidates.last().cloned().unwrap_or_else(|| field.to_string());

    match backend.field_caps(index, &candidates).await {
        Ok(caps) => match first_aggregatable(&candidates, &caps) {
            Some(found) => {
                tracing::debug!(field, resolved = %found, "Aggregatable field resolved");
                found
            }
            None => {
                tracing::debug!(
                    field,
                    fallback = %fallback,
                    "No aggregatable variant reported; using fallback"
                );
                fallback
            }
        },
        Err(e) => {
            tracing::warn!(
                field,
                index,
                error = %e,
                fallback = %fallback,
                "Field capability lookup failed; using fallback"
            );
            fallback
        }
    }
}

fn first_aggregatable(candidates: &[String], caps: &FieldCaps) -> Option<String> {
    candidates
        .iter()
        .find(|name| {
            caps.get(name.as_str())
                .is_some_and(|types| types.values().any(|c| c.aggregatable))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::{FieldCapability, ScrollPage};
    use crate::util::error::TransportError;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;

    /// Backend that only answers capability lookups.
    struct CapsOnly(Result<FieldCaps, ()>);

    #[async_trait]
    impl SearchBackend for CapsOnly {
        async fn field_caps(
            &self,
            _index: &str,
            _fields: &[String],
        ) -> Result<FieldCaps, TransportError> {
            self.0.clone().map_err(|_| TransportError::Status {
                operation: "field_caps",
                status: 503,
                body: "unavailable".into(),
            })
        }
        async fn open_scroll(
            &self,
            _: &str,
            _: &Value,
            _: usize,
            _: &str,
        ) -> Result<ScrollPage, TransportError> {
            unreachable!()
        }
        async fn scroll(&self, _: &str, _: &str) -> Result<ScrollPage, TransportError> {
            unreachable!()
        }
        async fn clear_scroll(&self, _: &str) -> Result<(), TransportError> {
            unreachable!()
        }
        async fn search(&self, _: &str, _: &Value) -> Result<Value, TransportError> {
            unreachable!()
        }
    }

    fn caps(entries: &[(&str, &str, bool)]) -> FieldCaps {
        let mut caps: FieldCaps = HashMap::new();
        for (field, ty, aggregatable) in entries {
            caps.entry(field.to_string()).or_default().insert(
                ty.to_string(),
                FieldCapability {
                    aggregatable: *aggregatable,
                },
            );
        }
        caps
    }

    #[test]
    fn test_candidates() {
        assert_eq!(candidates("host"), vec!["host", "host.keyword"]);
        assert_eq!(candidates("host.keyword"), vec!["host.keyword"]);
    }

    #[tokio::test]
    async fn test_keyword_variant_chosen_when_base_is_text() {
        let backend = CapsOnly(Ok(caps(&[
            ("container.name", "text", false),
            ("container.name.keyword", "keyword", true),
        ])));
        assert_eq!(
            resolve_aggregatable(&backend, "logs-*", "container.name").await,
            "container.name.keyword"
        );
    }

    #[tokio::test]
    async fn test_base_field_preferred_when_aggregatable() {
        let backend = CapsOnly(Ok(caps(&[
            ("level", "keyword", true),
            ("level.keyword", "keyword", true),
        ])));
        assert_eq!(resolve_aggregatable(&backend, "logs", "level").await, "level");
    }

    #[tokio::test]
    async fn test_any_mapping_counts() {
        // Conflicting mappings across indices: one of them is enough.
        let backend = CapsOnly(Ok(caps(&[("code", "text", false), ("code", "long", true)])));
        assert_eq!(resolve_aggregatable(&backend, "logs-*", "code").await, "code");
    }

    #[tokio::test]
    async fn test_nothing_aggregatable_falls_back_to_last() {
        let backend = CapsOnly(Ok(caps(&[("msg", "text", false)])));
        assert_eq!(resolve_aggregatable(&backend, "logs", "msg").await, "msg.keyword");
    }

    #[tokio::test]
    async fn test_lookup_error_falls_back_without_failing() {
        let backend = CapsOnly(Err(()));
        assert_eq!(resolve_aggregatable(&backend, "logs", "field").await, "field.keyword");
        assert_eq!(
            resolve_aggregatable(&backend, "logs", "field.keyword").await,
            "field.keyword"
        );
    }
}

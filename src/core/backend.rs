// LogScope - core/backend.rs
//
// The seam between the export engine and the document search backend.
// The engine only talks to `SearchBackend`; the real HTTP implementation
// lives in platform::es and tests plug in in-process fakes.
//
// Every call is an async suspension point. A backend value is built per
// request by a `Connector` and dropped when the request ends, so no
// connection parameters are ever shared between concurrent requests.

use crate::util::error::TransportError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Where and how to connect for one request. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Base URL including scheme, e.g. `http://es:9200`.
    pub host: String,
    /// Optional API key sent as `Authorization: ApiKey <key>`.
    pub api_key: Option<String>,
}

// The api key must never reach log output.
impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One matched document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hit {
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
}

impl Hit {
    /// Text of `field` as one output line: strings verbatim, other JSON
    /// values rendered as JSON, absent/null as the empty string.
    pub fn text(&self, field: &str) -> String {
        match self.source.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// One page of a scroll. `scroll_id` is the handle for the next page.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub scroll_id: Option<String>,
    pub hits: Vec<Hit>,
}

/// Capability of one field for one mapped type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldCapability {
    #[serde(default)]
    pub aggregatable: bool,
}

/// Field name → mapped type → capability, as reported by the backend.
pub type FieldCaps = HashMap<String, HashMap<String, FieldCapability>>;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Aggregatability metadata for `fields` across `index`.
    async fn field_caps(&self, index: &str, fields: &[String])
        -> Result<FieldCaps, TransportError>;

    /// Run `body` against `index` and open a scroll cursor on the result.
    async fn open_scroll(
        &self,
        index: &str,
        body: &Value,
        page_size: usize,
        keep_alive: &str,
    ) -> Result<ScrollPage, TransportError>;

    /// Fetch the page after the one `scroll_id` points at.
    async fn scroll(&self, scroll_id: &str, keep_alive: &str)
        -> Result<ScrollPage, TransportError>;

    /// Release a scroll cursor on the backend.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), TransportError>;

    /// Single non-paginated search; returns the raw response body.
    async fn search(&self, index: &str, body: &Value) -> Result<Value, TransportError>;
}

/// Builds a fresh, request-scoped backend handle.
pub trait Connector: Send + Sync {
    fn connect(&self, target: &ConnectionTarget)
        -> Result<Box<dyn SearchBackend>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(source: Value) -> Hit {
        serde_json::from_value(json!({ "_source": source })).unwrap()
    }

    #[test]
    fn test_hit_text_variants() {
        assert_eq!(hit(json!({"message": "boot ok"})).text("message"), "boot ok");
        assert_eq!(hit(json!({"other": 1})).text("message"), "");
        assert_eq!(hit(json!({"message": null})).text("message"), "");
        assert_eq!(hit(json!({"message": 42})).text("message"), "42");
    }

    #[test]
    fn test_hit_without_source_is_empty() {
        let h: Hit = serde_json::from_value(json!({"_id": "1"})).unwrap();
        assert_eq!(h.text("message"), "");
    }

    #[test]
    fn test_connection_target_debug_redacts_key() {
        let target = ConnectionTarget {
            host: "http://es:9200".into(),
            api_key: Some("c2VjcmV0".into()),
        };
        let shown = format!("{target:?}");
        assert!(shown.contains("http://es:9200"));
        assert!(!shown.contains("c2VjcmV0"));
    }
}

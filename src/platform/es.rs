// LogScope - platform/es.rs
//
// Elasticsearch implementation of the `SearchBackend` seam over reqwest.
//
// Endpoints used:
//   POST   {host}/{index}/_search?scroll=..&size=..   open a scroll
//   POST   {host}/_search/scroll                      advance a scroll
//   DELETE {host}/_search/scroll                      release a scroll
//   GET    {host}/{index}/_field_caps?fields=..       field capabilities
//   POST   {host}/{index}/_search                     plain search
//
// Certificate verification is disabled: backends are commonly reached on
// internal addresses with self-signed certificates.

use crate::core::backend::{
    ConnectionTarget, Connector, FieldCaps, Hit, ScrollPage, SearchBackend,
};
use crate::util::constants::{DEFAULT_BACKEND_HOST, ERROR_BODY_PREVIEW_CHARS};
use crate::util::error::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Give a bare `host[:port]` an `http://` scheme; blank means the default host.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() {
        DEFAULT_BACKEND_HOST.to_string()
    } else if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Split a comma-separated host list, dropping blank entries.
pub fn parse_hosts(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

fn preview_body(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_PREVIEW_CHARS {
        return body.to_string();
    }
    let mut short: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Default, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

impl From<ScrollResponse> for ScrollPage {
    fn from(resp: ScrollResponse) -> Self {
        ScrollPage {
            scroll_id: resp.scroll_id,
            hits: resp.hits.hits,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FieldCapsResponse {
    #[serde(default)]
    fields: FieldCaps,
}

// =============================================================================
// Client
// =============================================================================

/// One request-scoped connection to an Elasticsearch cluster.
pub struct EsClient {
    client: Client,
    base: String,
}

impl EsClient {
    pub fn new(target: &ConnectionTarget) -> Result<Self, TransportError> {
        let base = normalize_host(&target.host)
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        if let Some(key) = &target.api_key {
            let mut value = HeaderValue::from_str(&format!("ApiKey {key}")).map_err(|_| {
                TransportError::Malformed {
                    operation: "connect",
                    reason: "api key is not a valid header value".to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .default_headers(headers)
            .build()
            .map_err(|source| TransportError::Client {
                host: base.clone(),
                source,
            })?;

        tracing::debug!(host = %base, api_key = target.api_key.is_some(), "Backend client built");
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `base` followed by `segments`, each percent-encoded as one path
    /// segment, so an index name can never alter the query or fragment.
    fn endpoint(&self, operation: &'static str, segments: &[&str]) -> Result<Url, TransportError> {
        let malformed = |reason: String| TransportError::Malformed { operation, reason };
        let mut url =
            Url::parse(&self.base).map_err(|e| malformed(format!("invalid host url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| malformed(format!("host url '{}' cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Http { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                operation,
                status: status.as_u16(),
                body: preview_body(&body),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Http { operation, source })?;
        serde_json::from_slice(&body).map_err(|e| TransportError::Malformed {
            operation,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl SearchBackend for EsClient {
    async fn field_caps(
        &self,
        index: &str,
        fields: &[String],
    ) -> Result<FieldCaps, TransportError> {
        let url = self.endpoint("field_caps", &[index, "_field_caps"])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", fields.join(","))]);
        let resp: FieldCapsResponse = self.send("field_caps", request).await?;
        Ok(resp.fields)
    }

    async fn open_scroll(
        &self,
        index: &str,
        body: &Value,
        page_size: usize,
        keep_alive: &str,
    ) -> Result<ScrollPage, TransportError> {
        let url = self.endpoint("search", &[index, "_search"])?;
        let request = self
            .client
            .post(url)
            .query(&[("scroll", keep_alive.to_string()), ("size", page_size.to_string())])
            .json(body);
        let resp: ScrollResponse = self.send("search", request).await?;
        Ok(resp.into())
    }

    async fn scroll(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<ScrollPage, TransportError> {
        let url = self.endpoint("scroll", &["_search", "scroll"])?;
        let request = self
            .client
            .post(url)
            .json(&json!({ "scroll": keep_alive, "scroll_id": scroll_id }));
        let resp: ScrollResponse = self.send("scroll", request).await?;
        Ok(resp.into())
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), TransportError> {
        let url = self.endpoint("clear_scroll", &["_search", "scroll"])?;
        let request = self
            .client
            .delete(url)
            .json(&json!({ "scroll_id": [scroll_id] }));
        let _: Value = self.send("clear_scroll", request).await?;
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, TransportError> {
        let url = self.endpoint("search", &[index, "_search"])?;
        let request = self.client.post(url).json(body);
        self.send("search", request).await
    }
}

/// Builds a fresh `EsClient` per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct EsConnector;

impl Connector for EsConnector {
    fn connect(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn SearchBackend>, TransportError> {
        Ok(Box::new(EsClient::new(target)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host(""), "http://localhost:9200");
        assert_eq!(normalize_host("   "), "http://localhost:9200");
        assert_eq!(normalize_host("es:9200"), "http://es:9200");
        assert_eq!(normalize_host(" https://es:9200 "), "https://es:9200");
    }

    #[test]
    fn test_parse_hosts() {
        assert_eq!(
            parse_hosts(" http://a:9200, ,b:9200,"),
            vec!["http://a:9200", "b:9200"]
        );
        assert!(parse_hosts("").is_empty());
    }

    #[test]
    fn test_error_body_is_truncated() {
        let long = "x".repeat(ERROR_BODY_PREVIEW_CHARS + 10);
        let shown = preview_body(&long);
        assert_eq!(shown.len(), ERROR_BODY_PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview_body("short"), "short");
    }

    #[test]
    fn test_scroll_response_decodes() {
        let resp: ScrollResponse = serde_json::from_value(json!({
            "_scroll_id": "FGluY2x1ZGVfY29udGV4dA",
            "took": 3,
            "hits": { "total": { "value": 2 }, "hits": [
                { "_id": "1", "_source": { "message": "a" } },
                { "_id": "2", "_source": {} }
            ] }
        }))
        .unwrap();
        let page: ScrollPage = resp.into();
        assert_eq!(page.scroll_id.as_deref(), Some("FGluY2x1ZGVfY29udGV4dA"));
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[0].text("message"), "a");
        assert_eq!(page.hits[1].text("message"), "");
    }

    #[test]
    fn test_field_caps_response_decodes() {
        let resp: FieldCapsResponse = serde_json::from_value(json!({
            "indices": ["logs-1"],
            "fields": {
                "host": { "text": { "type": "text", "searchable": true, "aggregatable": false } },
                "host.keyword": { "keyword": { "type": "keyword", "aggregatable": true } }
            }
        }))
        .unwrap();
        assert!(!resp.fields["host"]["text"].aggregatable);
        assert!(resp.fields["host.keyword"]["keyword"].aggregatable);
    }

    #[test]
    fn test_client_url_joins_base() {
        let client = EsClient::new(&ConnectionTarget {
            host: "es.internal:9200/".into(),
            api_key: Some("abc".into()),
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://es.internal:9200");
        assert_eq!(
            client.endpoint("scroll", &["_search", "scroll"]).unwrap().as_str(),
            "http://es.internal:9200/_search/scroll"
        );
    }

    #[test]
    fn test_index_is_encoded_as_one_segment() {
        let client = EsClient::new(&ConnectionTarget {
            host: "https://es.internal:9200/proxy/".into(),
            api_key: None,
        })
        .unwrap();

        let url = client.endpoint("search", &["a?b#c/d", "_search"]).unwrap();
        assert_eq!(url.path(), "/proxy/a%3Fb%23c%2Fd/_search");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = client.endpoint("search", &["logs-*,audit", "_search"]).unwrap();
        assert_eq!(url.as_str(), "https://es.internal:9200/proxy/logs-*,audit/_search");
    }

    #[test]
    fn test_unparseable_host_is_malformed() {
        let client = EsClient::new(&ConnectionTarget {
            host: "http://[bad".into(),
            api_key: None,
        })
        .unwrap();
        assert!(matches!(
            client.endpoint("search", &["logs", "_search"]),
            Err(TransportError::Malformed { operation: "search", .. })
        ));
    }

    #[test]
    fn test_invalid_api_key_is_rejected() {
        let result = EsClient::new(&ConnectionTarget {
            host: "es:9200".into(),
            api_key: Some("bad\nkey".into()),
        });
        assert!(matches!(result, Err(TransportError::Malformed { .. })));
    }
}

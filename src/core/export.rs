// LogScope - core/export.rs
//
// Size-capped scroll export of matched log lines to an async sink.
//
// Lifecycle of one export:
//   open scroll -> write page -> advance -> ... -> empty page | cap reached
// The backend cursor obtained along the way is released exactly once on
// every exit path, including failures. Release failures are logged only.

use crate::core::backend::SearchBackend;
use crate::core::model::ExportResult;
use crate::core::query::AssembledQuery;
use crate::util::constants::{
    MESSAGE_FIELD, SCROLL_ID_LOG_PREFIX, SCROLL_KEEP_ALIVE, SCROLL_PAGE_SIZE,
};
use crate::util::error::{ExportError, TransportError};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Paginated exporter. Holds only fixed paging parameters, so one value can
/// serve any number of requests.
#[derive(Debug, Clone)]
pub struct ScrollExporter {
    page_size: usize,
    keep_alive: String,
}

impl Default for ScrollExporter {
    fn default() -> Self {
        Self::new(SCROLL_PAGE_SIZE, SCROLL_KEEP_ALIVE)
    }
}

impl ScrollExporter {
    pub fn new(page_size: usize, keep_alive: impl Into<String>) -> Self {
        Self {
            page_size: page_size.max(1),
            keep_alive: keep_alive.into(),
        }
    }

    /// Write the `message` field of every hit of `query` over `index` to
    /// `sink`, one per line in ascending timestamp order, stopping once
    /// `max_size` lines have been written.
    ///
    /// `truncated` is set when the export stopped because the cap was
    /// reached. The sink is flushed on success.
    pub async fn export<W>(
        &self,
        backend: &dyn SearchBackend,
        index: &str,
        query: &AssembledQuery,
        max_size: usize,
        sink: &mut W,
    ) -> Result<ExportResult, ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let body = query.to_export_body();
        tracing::debug!(index, max_size, dsl = %body, "Starting scroll export");

        let mut cursor = Cursor::default();
        let outcome = self
            .drain(backend, index, &body, max_size, sink, &mut cursor)
            .await;
        cursor.release(backend).await;

        match &outcome {
            Ok(result) => tracing::info!(
                index,
                count = result.count,
                truncated = result.truncated,
                "Scroll export finished"
            ),
            Err(e) => tracing::warn!(index, error = %e, "Scroll export failed"),
        }
        outcome
    }

    async fn drain<W>(
        &self,
        backend: &dyn SearchBackend,
        index: &str,
        body: &Value,
        max_size: usize,
        sink: &mut W,
        cursor: &mut Cursor,
    ) -> Result<ExportResult, ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut result = ExportResult::default();
        let mut page = backend
            .open_scroll(index, body, self.page_size, &self.keep_alive)
            .await?;

        loop {
            let next = page.scroll_id.take();
            cursor.track(next.clone());

            if page.hits.is_empty() {
                break;
            }
            tracing::trace!(index, hits = page.hits.len(), "Scroll page received");

            for hit in &page.hits {
                if result.count >= max_size {
                    break;
                }
                let mut line = hit.text(MESSAGE_FIELD);
                line.push('\n');
                sink.write_all(line.as_bytes())
                    .await
                    .map_err(ExportError::Sink)?;
                result.count += 1;
            }

            // Stop at the cap without asking the backend for more.
            if result.count >= max_size {
                result.truncated = true;
                break;
            }

            let scroll_id = next.ok_or_else(|| TransportError::Malformed {
                operation: "scroll",
                reason: "non-empty page carried no scroll id".to_string(),
            })?;
            page = backend.scroll(&scroll_id, &self.keep_alive).await?;
        }

        sink.flush().await.map_err(ExportError::Sink)?;
        Ok(result)
    }
}

/// The backend scroll handle of one export.
///
/// Tracks the most recent id the backend handed out; `release` consumes the
/// cursor, so it can run at most once.
#[derive(Debug, Default)]
struct Cursor {
    id: Option<String>,
}

impl Cursor {
    fn track(&mut self, id: Option<String>) {
        if id.is_some() {
            self.id = id;
        }
    }

    async fn release(self, backend: &dyn SearchBackend) {
        let Some(id) = self.id else {
            return;
        };
        let shown: String = id.chars().take(SCROLL_ID_LOG_PREFIX).collect();
        match backend.clear_scroll(&id).await {
            Ok(()) => tracing::debug!(scroll_id = %shown, "Scroll cursor released"),
            Err(e) => tracing::warn!(
                scroll_id = %shown,
                error = %e,
                "Failed to release scroll cursor; it will expire on its own"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::{FieldCaps, Hit, ScrollPage};
    use crate::core::model::{Clause, TimeRange};
    use async_trait::async_trait;
    use serde_json::json;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};

    /// Serves pre-built pages; scroll ids are `sid-<page index>`.
    #[derive(Default)]
    struct PagedBackend {
        pages: Vec<Vec<Value>>,
        fail_advance_at: Option<usize>,
        fail_open: bool,
        fail_clear: bool,
        omit_ids: bool,
        served: Mutex<usize>,
        cleared: Mutex<Vec<String>>,
    }

    impl PagedBackend {
        fn with_messages(messages: &[&str], page_size: usize) -> Self {
            let docs: Vec<Value> = messages.iter().map(|m| json!({ "message": m })).collect();
            Self {
                pages: docs.chunks(page_size).map(<[Value]>::to_vec).collect(),
                ..Self::default()
            }
        }

        fn page(&self, n: usize) -> ScrollPage {
            let hits = self
                .pages
                .get(n)
                .map(|docs| {
                    docs.iter()
                        .map(|d| serde_json::from_value::<Hit>(json!({ "_source": d })).unwrap())
                        .collect()
                })
                .unwrap_or_default();
            ScrollPage {
                scroll_id: (!self.omit_ids).then(|| format!("sid-{n}")),
                hits,
            }
        }

        fn cleared(&self) -> Vec<String> {
            self.cleared.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchBackend for PagedBackend {
        async fn field_caps(&self, _: &str, _: &[String]) -> Result<FieldCaps, TransportError> {
            unreachable!()
        }

        async fn open_scroll(
            &self,
            _index: &str,
            body: &Value,
            page_size: usize,
            keep_alive: &str,
        ) -> Result<ScrollPage, TransportError> {
            assert_eq!(page_size, SCROLL_PAGE_SIZE);
            assert_eq!(keep_alive, SCROLL_KEEP_ALIVE);
            assert_eq!(body["sort"][0]["@timestamp"]["order"], "asc");
            if self.fail_open {
                return Err(TransportError::Status {
                    operation: "search",
                    status: 400,
                    body: "parse_exception".into(),
                });
            }
            *self.served.lock().unwrap() = 0;
            Ok(self.page(0))
        }

        async fn scroll(&self, scroll_id: &str, _: &str) -> Result<ScrollPage, TransportError> {
            let mut served = self.served.lock().unwrap();
            assert_eq!(scroll_id, format!("sid-{}", *served));
            *served += 1;
            if self.fail_advance_at == Some(*served) {
                return Err(TransportError::Status {
                    operation: "scroll",
                    status: 404,
                    body: "search_context_missing_exception".into(),
                });
            }
            Ok(self.page(*served))
        }

        async fn clear_scroll(&self, scroll_id: &str) -> Result<(), TransportError> {
            self.cleared.lock().unwrap().push(scroll_id.to_string());
            if self.fail_clear {
                return Err(TransportError::Status {
                    operation: "clear_scroll",
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(())
        }

        async fn search(&self, _: &str, _: &Value) -> Result<Value, TransportError> {
            unreachable!()
        }
    }

    /// Sink that rejects every write.
    struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left")))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn query() -> AssembledQuery {
        AssembledQuery::new(
            "*",
            TimeRange::default(),
            vec![Clause::Phrase {
                key: "level".into(),
                value: "error".into(),
            }],
        )
    }

    async fn run(
        backend: &PagedBackend,
        max_size: usize,
    ) -> (Result<ExportResult, ExportError>, String) {
        let mut sink: Vec<u8> = Vec::new();
        let result = ScrollExporter::default()
            .export(backend, "logs", &query(), max_size, &mut sink)
            .await;
        (result, String::from_utf8(sink).unwrap())
    }

    #[tokio::test]
    async fn test_no_matches() {
        let backend = PagedBackend::with_messages(&[], 2);
        let (result, out) = run(&backend, 10).await;
        assert_eq!(result.unwrap(), ExportResult { count: 0, truncated: false });
        assert!(out.is_empty());
        assert_eq!(backend.cleared(), vec!["sid-0"]);
    }

    #[tokio::test]
    async fn test_all_pages_written_in_order() {
        let backend = PagedBackend::with_messages(&["a", "b", "c", "d", "e"], 2);
        let (result, out) = run(&backend, 100).await;
        assert_eq!(result.unwrap(), ExportResult { count: 5, truncated: false });
        assert_eq!(out, "a\nb\nc\nd\ne\n");
        // Released once, with the latest handle.
        assert_eq!(backend.cleared(), vec!["sid-3"]);
    }

    #[tokio::test]
    async fn test_cap_reached_mid_page() {
        let backend = PagedBackend::with_messages(&["1", "2", "3", "4", "5", "6"], 4);
        let (result, out) = run(&backend, 3).await;
        assert_eq!(result.unwrap(), ExportResult { count: 3, truncated: true });
        assert_eq!(out, "1\n2\n3\n");
        assert_eq!(backend.cleared(), vec!["sid-0"]);
    }

    #[tokio::test]
    async fn test_one_more_document_than_cap() {
        let backend = PagedBackend::with_messages(&["1", "2", "3"], 1);
        let (result, out) = run(&backend, 2).await;
        let result = result.unwrap();
        assert_eq!(result.count, 2);
        assert!(result.truncated);
        assert_eq!(out.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_exactly_cap_documents_is_truncated() {
        let backend = PagedBackend::with_messages(&["1", "2", "3"], 2);
        let (result, out) = run(&backend, 3).await;
        assert_eq!(result.unwrap(), ExportResult { count: 3, truncated: true });
        assert_eq!(out, "1\n2\n3\n");
        // The cap is hit on the second page; no third page is requested.
        assert_eq!(*backend.served.lock().unwrap(), 1);
        assert_eq!(backend.cleared(), vec!["sid-1"]);
    }

    #[tokio::test]
    async fn test_cap_on_page_boundary_does_not_advance() {
        let backend = PagedBackend::with_messages(&["1", "2", "3", "4"], 2);
        let (result, out) = run(&backend, 2).await;
        assert_eq!(result.unwrap(), ExportResult { count: 2, truncated: true });
        assert_eq!(out, "1\n2\n");
        assert_eq!(*backend.served.lock().unwrap(), 0);
        assert_eq!(backend.cleared(), vec!["sid-0"]);
    }

    #[tokio::test]
    async fn test_zero_cap_writes_nothing() {
        let backend = PagedBackend::with_messages(&["a", "b"], 2);
        let (result, out) = run(&backend, 0).await;
        assert_eq!(result.unwrap(), ExportResult { count: 0, truncated: true });
        assert!(out.is_empty());
        assert_eq!(backend.cleared(), vec!["sid-0"]);

        let empty = PagedBackend::with_messages(&[], 2);
        let (result, out) = run(&empty, 0).await;
        assert_eq!(result.unwrap(), ExportResult { count: 0, truncated: false });
        assert!(out.is_empty());
        assert_eq!(empty.cleared(), vec!["sid-0"]);
    }

    #[tokio::test]
    async fn test_missing_and_non_string_messages() {
        let backend = PagedBackend {
            pages: vec![vec![
                json!({}),
                json!({ "message": { "k": 1 } }),
                json!({ "message": "x" }),
            ]],
            ..PagedBackend::default()
        };
        let (result, out) = run(&backend, 10).await;
        assert_eq!(result.unwrap().count, 3);
        assert_eq!(out, "\n{\"k\":1}\nx\n");
    }

    #[tokio::test]
    async fn test_advance_failure_still_releases_once() {
        let backend = PagedBackend {
            fail_advance_at: Some(2),
            ..PagedBackend::with_messages(&["a", "b", "c", "d", "e"], 2)
        };
        let (result, out) = run(&backend, 100).await;
        assert!(matches!(
            result,
            Err(ExportError::Transport(TransportError::Status { status: 404, .. }))
        ));
        // Partial output stays in the sink.
        assert_eq!(out, "a\nb\nc\nd\n");
        assert_eq!(backend.cleared(), vec!["sid-1"]);
    }

    #[tokio::test]
    async fn test_open_failure_has_nothing_to_release() {
        let backend = PagedBackend {
            fail_open: true,
            ..PagedBackend::default()
        };
        let (result, _) = run(&backend, 10).await;
        assert!(matches!(result, Err(ExportError::Transport(_))));
        assert!(backend.cleared().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_sink_error_and_releases() {
        let backend = PagedBackend::with_messages(&["a"], 1);
        let mut sink = BrokenSink;
        let result = ScrollExporter::default()
            .export(&backend, "logs", &query(), 10, &mut sink)
            .await;
        assert!(matches!(result, Err(ExportError::Sink(_))));
        assert_eq!(backend.cleared(), vec!["sid-0"]);
    }

    #[tokio::test]
    async fn test_missing_scroll_id_cannot_advance() {
        let backend = PagedBackend {
            omit_ids: true,
            ..PagedBackend::with_messages(&["a", "b", "c"], 2)
        };
        let (result, _) = run(&backend, 10).await;
        assert!(matches!(
            result,
            Err(ExportError::Transport(TransportError::Malformed { .. }))
        ));
        assert!(backend.cleared().is_empty());
    }

    #[tokio::test]
    async fn test_release_failure_is_suppressed() {
        let backend = PagedBackend {
            fail_clear: true,
            ..PagedBackend::with_messages(&["a"], 5)
        };
        let (result, out) = run(&backend, 10).await;
        assert_eq!(result.unwrap().count, 1);
        assert_eq!(out, "a\n");
        assert_eq!(backend.cleared().len(), 1);
    }
}

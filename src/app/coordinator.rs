// LogScope - app/coordinator.rs
//
// Request orchestration: validation, connection target resolution, preset
// lookup, query assembly, and the export/suggest flows.
//
// Each request connects its own backend handle and drops it before
// returning; the coordinator itself holds no per-request state and can be
// shared across concurrent requests.

use crate::app::artifacts::ArtifactStore;
use crate::app::store::ConfigStore;
use crate::core::backend::{ConnectionTarget, Connector};
use crate::core::export::ScrollExporter;
use crate::core::model::{Artifact, ExportResult, Filters, Preset, Suggestion};
use crate::core::query::{self, AssembledQuery};
use crate::core::{fields, filter, time};
use crate::util::constants::{
    DEFAULT_EXPORT_SIZE, DEFAULT_QUERY, DEFAULT_SUGGEST_SIZE, MAX_EXPORT_SIZE, MAX_SUGGEST_SIZE,
    MIN_EXPORT_SIZE, MIN_SUGGEST_SIZE,
};
use crate::util::error::{ExportError, NotFoundError, ResourceError, Result, ValidationError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::BufWriter;

// =============================================================================
// Requests and responses
// =============================================================================

/// Parameters shared by export and suggestion requests.
#[derive(Clone, Default, Deserialize)]
pub struct SearchScope {
    /// Index or index pattern to search. Required.
    #[serde(default)]
    pub index: String,
    /// Free-text query; blank means match everything.
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub filters: Filters,
    /// Stored connection to use. Takes precedence over `host`/`api_key`.
    #[serde(default)]
    pub connection_id: Option<i64>,
    /// Stored preset to seed the filters with.
    #[serde(default)]
    pub preset_id: Option<i64>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_query() -> String {
    DEFAULT_QUERY.to_string()
}

fn default_export_size() -> usize {
    DEFAULT_EXPORT_SIZE
}

fn default_suggest_size() -> usize {
    DEFAULT_SUGGEST_SIZE
}

#[derive(Clone, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub scope: SearchScope,
    /// Maximum number of lines to write.
    #[serde(default = "default_export_size")]
    pub size: usize,
}

#[derive(Clone, Deserialize)]
pub struct SuggestRequest {
    #[serde(flatten)]
    pub scope: SearchScope,
    /// Field whose values are suggested. Required.
    #[serde(default)]
    pub field: String,
    /// Maximum number of values returned.
    #[serde(default = "default_suggest_size")]
    pub size: usize,
}

/// A finished export: where it was written and how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub artifact: Artifact,
    #[serde(flatten)]
    pub result: ExportResult,
}

// =============================================================================
// Coordinator
// =============================================================================

pub struct ExportCoordinator {
    connector: Arc<dyn Connector>,
    store: Arc<dyn ConfigStore>,
    artifacts: ArtifactStore,
    exporter: ScrollExporter,
    default_host: String,
}

impl ExportCoordinator {
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<dyn ConfigStore>,
        artifacts: ArtifactStore,
        default_host: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            store,
            artifacts,
            exporter: ScrollExporter::default(),
            default_host: default_host.into(),
        }
    }

    pub fn with_exporter(mut self, exporter: ScrollExporter) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Export matching log lines into a new artifact.
    ///
    /// Zero matching lines is reported as `NotFound` and leaves no artifact
    /// behind. On a failure mid-export the partial artifact stays on disk.
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportOutcome> {
        let scope = &request.scope;
        require("index", &scope.index)?;
        check_range("size", request.size, MIN_EXPORT_SIZE, MAX_EXPORT_SIZE)?;

        let target = self.target(scope)?;
        let query = self.assemble(scope, None)?;

        tracing::info!(
            index = %scope.index,
            host = %target.host,
            size = request.size,
            "Export requested"
        );

        let backend = self.connector.connect(&target)?;
        let (artifact, file) = self.artifacts.create().await?;
        let mut sink = BufWriter::new(file);

        let outcome = self
            .exporter
            .export(backend.as_ref(), &scope.index, &query, request.size, &mut sink)
            .await;
        drop(sink);
        drop(backend);

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    path = %artifact.path.display(),
                    "Export failed; partial output left on disk"
                );
                return Err(match e {
                    ExportError::Transport(e) => e.into(),
                    ExportError::Sink(source) => ResourceError::Io {
                        path: artifact.path.clone(),
                        operation: "write",
                        source,
                    }
                    .into(),
                });
            }
        };

        if result.count == 0 {
            if let Err(e) = self.artifacts.remove(&artifact.name).await {
                tracing::warn!(
                    path = %artifact.path.display(),
                    error = %e,
                    "Failed to remove empty artifact"
                );
            }
            return Err(NotFoundError::NoMatches {
                index: scope.index.clone(),
            }
            .into());
        }

        tracing::info!(
            artifact = %artifact.name,
            count = result.count,
            truncated = result.truncated,
            "Export complete"
        );
        Ok(ExportOutcome { artifact, result })
    }

    /// Suggest values for `request.field` under the same query and filters,
    /// ignoring any filter on the field itself.
    pub async fn suggest(&self, request: &SuggestRequest) -> Result<Suggestion> {
        let scope = &request.scope;
        require("index", &scope.index)?;
        require("field", &request.field)?;
        check_range("size", request.size, MIN_SUGGEST_SIZE, MAX_SUGGEST_SIZE)?;

        let field = request.field.trim();
        let target = self.target(scope)?;
        let query = self.assemble(scope, Some(field))?;

        let backend = self.connector.connect(&target)?;
        let resolved = fields::resolve_aggregatable(backend.as_ref(), &scope.index, field).await;
        let body = query.to_terms_body(&resolved, request.size);
        tracing::debug!(index = %scope.index, dsl = %body, "Suggestion query");

        let response = backend.search(&scope.index, &body).await?;
        drop(backend);

        let values = query::term_values(&response)?;
        tracing::info!(
            index = %scope.index,
            field = %resolved,
            values = values.len(),
            "Suggestion complete"
        );
        Ok(Suggestion {
            field: resolved,
            values,
        })
    }

    /// Stored connection if one is named, else the explicit host and key,
    /// else the default host without a key.
    fn target(&self, scope: &SearchScope) -> Result<ConnectionTarget> {
        if let Some(id) = scope.connection_id {
            let conn = self
                .store
                .connection(id)
                .ok_or(ValidationError::UnknownConnection { id })?;
            tracing::debug!(id, name = %conn.name, "Using stored connection");
            return Ok(ConnectionTarget {
                host: conn.host,
                api_key: non_blank(conn.api_key.as_deref()),
            });
        }

        Ok(ConnectionTarget {
            host: non_blank(scope.host.as_deref()).unwrap_or_else(|| self.default_host.clone()),
            api_key: non_blank(scope.api_key.as_deref()),
        })
    }

    fn preset(&self, id: Option<i64>) -> Result<Option<Preset>> {
        match id {
            Some(id) => Ok(Some(
                self.store
                    .preset(id)
                    .ok_or(ValidationError::UnknownPreset { id })?,
            )),
            None => Ok(None),
        }
    }

    /// Build the query for `scope`, leaving out filters on `exclude_field`.
    fn assemble(&self, scope: &SearchScope, exclude_field: Option<&str>) -> Result<AssembledQuery> {
        let preset = self.preset(scope.preset_id)?;
        let range = time::effective_range(
            scope.start_time.as_deref(),
            scope.end_time.as_deref(),
            Utc::now(),
        )?;

        let mut merged = filter::build(&scope.filters, preset.as_ref());
        if let Some(field) = exclude_field {
            merged = filter::without_field(&merged, field);
        }

        let text = match scope.query.trim() {
            "" => DEFAULT_QUERY,
            q => q,
        };
        Ok(AssembledQuery::new(text, range, filter::to_clauses(&merged)))
    }
}

fn require(field: &'static str, value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

fn check_range(
    field: &'static str,
    value: usize,
    min: usize,
    max: usize,
) -> std::result::Result<(), ValidationError> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

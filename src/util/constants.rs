// LogScope - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogScope";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogScope";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Request defaults and limits
// =============================================================================

/// Free-text query used when a request does not supply one (match everything).
pub const DEFAULT_QUERY: &str = "*";

/// Default number of lines written by a single export.
pub const DEFAULT_EXPORT_SIZE: usize = 50_000;

/// Minimum export size accepted from a request.
pub const MIN_EXPORT_SIZE: usize = 1;

/// Hard upper bound on the export size. Keeps artifacts small enough to be
/// downloaded and previewed without streaming tricks on the caller side.
pub const MAX_EXPORT_SIZE: usize = 200_000;

/// Default number of distinct values returned by a suggestion request.
pub const DEFAULT_SUGGEST_SIZE: usize = 200;

/// Minimum suggestion size accepted from a request.
pub const MIN_SUGGEST_SIZE: usize = 1;

/// Maximum suggestion size accepted from a request.
pub const MAX_SUGGEST_SIZE: usize = 1_000;

// =============================================================================
// Backend query shape
// =============================================================================

/// Documents fetched per scroll page.
pub const SCROLL_PAGE_SIZE: usize = 2_000;

/// Backend-side cursor lifetime between two page fetches.
pub const SCROLL_KEEP_ALIVE: &str = "2m";

/// Field the time range applies to and the export is sorted by.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Source field whose value becomes one line of the artifact.
pub const MESSAGE_FIELD: &str = "message";

/// Suffix of the exact-value sub-field that dynamic mappings create for text.
pub const KEYWORD_SUFFIX: &str = ".keyword";

/// Name of the terms aggregation used by the suggestion query.
pub const SUGGEST_AGGREGATION_NAME: &str = "values";

/// Fixed offset (seconds east of UTC) assumed for timestamps without a zone.
/// Naive request times and the default day boundary are UTC+8 wall clock.
pub const NAIVE_INPUT_UTC_OFFSET_SECS: i32 = 8 * 3_600;

// =============================================================================
// Backend connection
// =============================================================================

/// Host used when neither the request, a stored connection, the environment,
/// nor config.toml names one.
pub const DEFAULT_BACKEND_HOST: &str = "http://localhost:9200";

/// Environment variable holding a comma-separated host list; the first entry
/// overrides `[backend] default_host`.
pub const BACKEND_HOSTS_ENV: &str = "ES_HOSTS";

/// Maximum number of characters of a failed response body kept in an error.
pub const ERROR_BODY_PREVIEW_CHARS: usize = 512;

// =============================================================================
// Artifacts
// =============================================================================

/// File name prefix of every export artifact.
pub const ARTIFACT_PREFIX: &str = "log_";

/// File name extension of every export artifact.
pub const ARTIFACT_EXTENSION: &str = "txt";

/// Artifacts subdirectory name (inside the platform data directory).
pub const ARTIFACTS_DIR_NAME: &str = "exports";

/// Delay after which a served artifact is deleted.
pub const DEFAULT_CLEANUP_DELAY_SECS: u64 = 120;

/// Minimum configurable cleanup delay.
pub const MIN_CLEANUP_DELAY_SECS: u64 = 1;

/// Maximum configurable cleanup delay (one day).
pub const MAX_CLEANUP_DELAY_SECS: u64 = 86_400;

/// Number of bytes returned by a preview.
pub const DEFAULT_PREVIEW_MAX_BYTES: usize = 200_000;

/// Minimum configurable preview size.
pub const MIN_PREVIEW_MAX_BYTES: usize = 1_024;

/// Maximum configurable preview size.
pub const MAX_PREVIEW_MAX_BYTES: usize = 10 * 1_024 * 1_024; // 10 MB

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Number of characters of a scroll id included in log output.
pub const SCROLL_ID_LOG_PREFIX: usize = 12;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

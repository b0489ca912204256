// LogScope - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Each category is its own enum; `LogScopeError` is the top-level union
// reported to callers. Callers distinguish "bad request" (Validation) from
// "no data" (NotFound) from "backend trouble" (Transport) from "local disk
// trouble" (Resource).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all LogScope operations.
#[derive(Debug, Error)]
pub enum LogScopeError {
    /// The request was malformed or referenced something that does not exist.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The request was valid but produced no data.
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// The search backend could not be reached or rejected a call.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A local artifact could not be created, written, or read.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// An explicitly requested configuration file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<TimeParseError> for LogScopeError {
    fn from(e: TimeParseError) -> Self {
        Self::Validation(ValidationError::Time(e))
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A time string did not match any recognised ISO-8601 variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{input}' is not a recognised ISO-8601 timestamp")]
pub struct TimeParseError {
    /// The offending input, verbatim.
    pub input: String,
}

/// Errors caused by the request itself. Never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A start or end time could not be parsed.
    #[error("{0}")]
    Time(#[from] TimeParseError),

    /// A numeric request field is outside its accepted range.
    #[error("'{field}' = {value} is out of range ({min}-{max})")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    /// A required request field is missing or blank.
    #[error("'{field}' is required")]
    MissingField { field: &'static str },

    /// The request referenced a stored connection that does not exist.
    #[error("unknown connection id {id}")]
    UnknownConnection { id: i64 },

    /// The request referenced a stored filter preset that does not exist.
    #[error("unknown filter preset id {id}")]
    UnknownPreset { id: i64 },

    /// An artifact name contained path components or unexpected characters.
    #[error("invalid artifact name '{name}'")]
    InvalidArtifactName { name: String },
}

// ---------------------------------------------------------------------------
// Not-found errors
// ---------------------------------------------------------------------------

/// "No data" outcomes, distinct from bad requests.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// The export query matched no documents.
    #[error("no log lines matched in index '{index}'")]
    NoMatches { index: String },

    /// The artifact was never created or has already been cleaned up.
    #[error("artifact '{name}' does not exist")]
    Artifact { name: String },
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures talking to the search backend. Propagated as-is; no retry.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be built for the given connection.
    #[error("cannot build backend client for '{host}': {source}")]
    Client {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{operation} failed: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("{operation} rejected with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The backend answered with a body that does not have the expected shape.
    #[error("{operation} returned an unexpected response: {reason}")]
    Malformed {
        operation: &'static str,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors raised inside the scroll exporter. The exporter only knows about a
/// generic sink, so the coordinator attaches the artifact path.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Opening or advancing the scroll cursor failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Writing to the output sink failed.
    #[error("failed writing export output: {0}")]
    Sink(#[source] io::Error),
}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

/// Local artifact I/O failures. Fatal for the in-flight request; partially
/// written output is left on disk.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// I/O error with path context.
    #[error("I/O error during {operation} on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing failed.
    #[error("Config parse error '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// I/O error reading config file.
    #[error("Config I/O error '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Convenience type alias for LogScope results.
pub type Result<T> = std::result::Result<T, LogScopeError>;

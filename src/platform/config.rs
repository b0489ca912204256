// LogScope - platform/config.rs
//
// Platform-specific configuration, data directory resolution, and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::{ConnectionConfig, Preset};
use crate::platform::es;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved platform paths for LogScope data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logscope/ or %APPDATA%\LogScope\config\)
    pub config_dir: PathBuf,

    /// Data directory; export artifacts live in its `exports/` subdirectory.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }

    /// Default artifact directory.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join(constants::ARTIFACTS_DIR_NAME)
    }
}

// =============================================================================
// config.toml shape
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[backend]` section.
    pub backend: BackendSection,
    /// `[export]` section.
    pub export: ExportSection,
    /// `[artifacts]` section.
    pub artifacts: ArtifactsSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
    /// `[[connections]]` entries.
    pub connections: Vec<ConnectionConfig>,
    /// `[[presets]]` entries.
    pub presets: Vec<Preset>,
}

/// `[backend]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Host used when a request names no connection and no host.
    pub default_host: Option<String>,
}

/// `[export]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Line cap used when a request does not give one.
    pub default_size: Option<usize>,
}

/// `[artifacts]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ArtifactsSection {
    /// Where artifacts are written (default: platform data dir).
    pub directory: Option<String>,
    /// Delay before a served artifact is deleted.
    pub cleanup_delay_seconds: Option<u64>,
    /// Bytes returned by a preview.
    pub preview_max_bytes: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Backend --
    /// Fallback backend host, scheme included.
    pub default_host: String,

    // -- Export --
    pub default_export_size: usize,

    // -- Artifacts --
    /// Explicit artifact directory; `None` uses the platform data dir.
    pub artifacts_dir: Option<PathBuf>,
    pub cleanup_delay: Duration,
    pub preview_max_bytes: usize,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,

    // -- Stored configuration --
    pub connections: Vec<ConnectionConfig>,
    pub presets: Vec<Preset>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_host: constants::DEFAULT_BACKEND_HOST.to_string(),
            default_export_size: constants::DEFAULT_EXPORT_SIZE,
            artifacts_dir: None,
            cleanup_delay: Duration::from_secs(constants::DEFAULT_CLEANUP_DELAY_SECS),
            preview_max_bytes: constants::DEFAULT_PREVIEW_MAX_BYTES,
            log_level: None,
            log_file: None,
            connections: Vec::new(),
            presets: Vec::new(),
        }
    }
}

// =============================================================================
// Loading and validation
// =============================================================================

/// Read and parse a config file.
pub fn read_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate the configuration.
///
/// With an explicit `path`, any read or parse failure is an error. Otherwise
/// the default location is used: a missing file yields defaults with no
/// warnings, an unreadable or unparseable one yields defaults plus a warning.
/// The first host in `ES_HOSTS` overrides `[backend] default_host`.
pub fn load_config(
    path: Option<&Path>,
    paths: &PlatformPaths,
) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let env_hosts = std::env::var(constants::BACKEND_HOSTS_ENV).ok();

    let raw = match path {
        Some(path) => {
            let raw = read_config(path)?;
            tracing::info!(path = %path.display(), "Loaded config.toml");
            raw
        }
        None => {
            let default_path = paths.config_file();
            if !default_path.exists() {
                tracing::debug!(
                    path = %default_path.display(),
                    "No config.toml found; using defaults"
                );
                RawConfig::default()
            } else {
                match read_config(&default_path) {
                    Ok(raw) => {
                        tracing::info!(path = %default_path.display(), "Loaded config.toml");
                        raw
                    }
                    Err(e) => {
                        let msg = format!("{e}. Using defaults.");
                        tracing::warn!("{}", msg);
                        let (config, mut warnings) =
                            validate(RawConfig::default(), env_hosts.as_deref());
                        warnings.insert(0, msg);
                        return Ok((config, warnings));
                    }
                }
            }
        }
    };

    Ok(validate(raw, env_hosts.as_deref()))
}

/// Validate each field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig, env_hosts: Option<&str>) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig::default();

    // -- Backend: default_host --
    if let Some(ref host) = raw.backend.default_host {
        if host.trim().is_empty() {
            warnings.push(format!(
                "[backend] default_host is empty. Using default ({}).",
                constants::DEFAULT_BACKEND_HOST,
            ));
        } else {
            config.default_host = es::normalize_host(host);
        }
    }
    if let Some(first) = env_hosts.and_then(|v| es::parse_hosts(v).into_iter().next()) {
        config.default_host = es::normalize_host(&first);
    }

    // -- Export: default_size --
    if let Some(size) = raw.export.default_size {
        if (constants::MIN_EXPORT_SIZE..=constants::MAX_EXPORT_SIZE).contains(&size) {
            config.default_export_size = size;
        } else {
            warnings.push(format!(
                "[export] default_size = {size} is out of range ({}-{}). Using default ({}).",
                constants::MIN_EXPORT_SIZE,
                constants::MAX_EXPORT_SIZE,
                constants::DEFAULT_EXPORT_SIZE,
            ));
        }
    }

    // -- Artifacts: directory --
    if let Some(ref dir) = raw.artifacts.directory {
        if !dir.trim().is_empty() {
            config.artifacts_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    // -- Artifacts: cleanup_delay_seconds --
    if let Some(secs) = raw.artifacts.cleanup_delay_seconds {
        if (constants::MIN_CLEANUP_DELAY_SECS..=constants::MAX_CLEANUP_DELAY_SECS).contains(&secs) {
            config.cleanup_delay = Duration::from_secs(secs);
        } else {
            warnings.push(format!(
                "[artifacts] cleanup_delay_seconds = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_CLEANUP_DELAY_SECS,
                constants::MAX_CLEANUP_DELAY_SECS,
                constants::DEFAULT_CLEANUP_DELAY_SECS,
            ));
        }
    }

    // -- Artifacts: preview_max_bytes --
    if let Some(bytes) = raw.artifacts.preview_max_bytes {
        if (constants::MIN_PREVIEW_MAX_BYTES..=constants::MAX_PREVIEW_MAX_BYTES).contains(&bytes) {
            config.preview_max_bytes = bytes;
        } else {
            warnings.push(format!(
                "[artifacts] preview_max_bytes = {bytes} is out of range ({}-{}). Using default ({}).",
                constants::MIN_PREVIEW_MAX_BYTES,
                constants::MAX_PREVIEW_MAX_BYTES,
                constants::DEFAULT_PREVIEW_MAX_BYTES,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    // -- Connections --
    for conn in raw.connections {
        if conn.host.trim().is_empty() {
            warnings.push(format!(
                "[[connections]] id = {} has an empty host. Entry skipped.",
                conn.id
            ));
            continue;
        }
        config.connections.push(conn);
    }

    // -- Presets --
    for preset in raw.presets {
        if preset.key.trim().is_empty() {
            warnings.push(format!(
                "[[presets]] id = {} has an empty key. Entry skipped.",
                preset.id
            ));
            continue;
        }
        config.presets.push(preset);
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

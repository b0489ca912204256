// LogScope - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Wiring the coordinator to the Elasticsearch connector and config store
// 4. Running one subcommand on the tokio runtime
//
// Exit codes: 0 success, 2 nothing found, 1 any other error.

use clap::{Args, Parser, Subcommand};
use logscope::app::artifacts::ArtifactStore;
use logscope::app::coordinator::{ExportCoordinator, ExportRequest, SearchScope, SuggestRequest};
use logscope::app::store::{ConfigStore, MemoryConfigStore};
use logscope::core::model::Filters;
use logscope::platform::config::{self, AppConfig, PlatformPaths};
use logscope::platform::es::EsConnector;
use logscope::util::{self, error::LogScopeError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// LogScope - export log lines from Elasticsearch into local text files.
#[derive(Parser, Debug)]
#[command(name = "logscope", version, about)]
struct Cli {
    /// Path to config.toml (default: platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export matching log lines into a new artifact.
    Export {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Maximum number of lines (1-200000; default from config).
        #[arg(short = 'n', long)]
        size: Option<usize>,

        /// Print a preview of the artifact after exporting.
        #[arg(long)]
        preview: bool,

        /// Delete the artifact after the configured cleanup delay, waiting
        /// for it before exiting.
        #[arg(long)]
        expire: bool,
    },

    /// Suggest values for a field under the given query and filters.
    Suggest {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Field to suggest values for.
        #[arg(long)]
        field: String,

        /// Maximum number of values (1-1000).
        #[arg(short = 'n', long, default_value_t = util::constants::DEFAULT_SUGGEST_SIZE)]
        size: usize,
    },

    /// Print the beginning of an existing artifact.
    Preview {
        /// Artifact file name, e.g. log_<id>.txt
        name: String,

        /// Maximum bytes to print (default from config).
        #[arg(long)]
        max_bytes: Option<usize>,
    },

    /// List stored filter presets, newest first.
    Presets,
}

#[derive(Args, Debug)]
struct ScopeArgs {
    /// Index or index pattern.
    #[arg(short = 'i', long)]
    index: String,

    /// Free-text query in query-string syntax.
    #[arg(short = 'q', long, default_value = util::constants::DEFAULT_QUERY)]
    query: String,

    /// Start of the time range (naive times are UTC+8).
    #[arg(long)]
    start: Option<String>,

    /// End of the time range (naive times are UTC+8).
    #[arg(long)]
    end: Option<String>,

    /// Field filter as key=value; repeat a key to allow several values.
    #[arg(short = 'f', long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Stored connection id.
    #[arg(long = "connection")]
    connection_id: Option<i64>,

    /// Stored filter preset id.
    #[arg(long = "preset")]
    preset_id: Option<i64>,

    /// Backend host, used when no connection id is given.
    #[arg(long)]
    host: Option<String>,

    /// Backend API key, used when no connection id is given.
    #[arg(long, env = "LOGSCOPE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

impl ScopeArgs {
    fn into_scope(self) -> SearchScope {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in self.filters {
            grouped.entry(key).or_default().push(value);
        }
        let mut filters = Filters::new();
        for (key, values) in grouped {
            filters.insert_values(key, values);
        }

        SearchScope {
            index: self.index,
            query: self.query,
            start_time: self.start,
            end_time: self.end,
            filters,
            connection_id: self.connection_id,
            preset_id: self.preset_id,
            host: self.host,
            api_key: self.api_key,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let (app_config, warnings) = match config::load_config(cli.config.as_deref(), &platform_paths) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "LogScope starting"
    );

    let code = match run(cli.command, &app_config, &platform_paths).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            match e {
                LogScopeError::NotFound(_) => 2,
                _ => 1,
            }
        }
    };
    std::process::exit(code);
}

async fn run(
    command: Command,
    app_config: &AppConfig,
    paths: &PlatformPaths,
) -> Result<(), LogScopeError> {
    let store = Arc::new(MemoryConfigStore::new(
        app_config.connections.clone(),
        app_config.presets.clone(),
    ));
    let artifacts = ArtifactStore::new(
        app_config
            .artifacts_dir
            .clone()
            .unwrap_or_else(|| paths.artifacts_dir()),
    );
    let coordinator = ExportCoordinator::new(
        Arc::new(EsConnector),
        store.clone(),
        artifacts.clone(),
        app_config.default_host.clone(),
    );

    match command {
        Command::Export {
            scope,
            size,
            preview,
            expire,
        } => {
            let request = ExportRequest {
                scope: scope.into_scope(),
                size: size.unwrap_or(app_config.default_export_size),
            };
            let outcome = coordinator.export(&request).await?;
            print_json(&outcome);

            if preview {
                let text = artifacts
                    .preview(&outcome.artifact.name, app_config.preview_max_bytes)
                    .await?;
                print!("{text}");
            }
            if expire {
                let handle =
                    artifacts.schedule_removal(&outcome.artifact.name, app_config.cleanup_delay)?;
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "Artifact removal task did not complete");
                }
            }
        }
        Command::Suggest { scope, field, size } => {
            let request = SuggestRequest {
                scope: scope.into_scope(),
                field,
                size,
            };
            let suggestion = coordinator.suggest(&request).await?;
            print_json(&suggestion);
        }
        Command::Preview { name, max_bytes } => {
            let text = artifacts
                .preview(&name, max_bytes.unwrap_or(app_config.preview_max_bytes))
                .await?;
            print!("{text}");
        }
        Command::Presets => {
            for preset in store.presets() {
                print_json(&preset);
            }
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialise output"),
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "faucet.log";
pub const ERR_LOG_FILE_NAME: &str = "faucet_err.log";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for `faucet.log` and `faucet_err.log`; console only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Console format (json, pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

/// Log format types
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl From<&str> for LogFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

/// Initialize the global subscriber.
///
/// With a `log_dir` every event also goes to a daily rolling `faucet.log`,
/// and WARN and above additionally to `faucet_err.log`. The returned guards
/// flush the file writers and must live until shutdown.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Vec<WorkerGuard>> {
    let env_filter = build_env_filter(config)?;

    let console = match LogFormat::from(config.format.as_str()) {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    let mut guards = Vec::new();
    let (file_layer, err_layer) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;

            let (file_writer, file_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_NAME));
            let (err_writer, err_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, ERR_LOG_FILE_NAME));
            guards.push(file_guard);
            guards.push(err_guard);

            (
                Some(fmt::layer().with_ansi(false).with_writer(file_writer)),
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(err_writer)
                        .with_filter(LevelFilter::WARN),
                ),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .with(err_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set subscriber: {}", e))?;

    tracing::info!("Logging system initialized with level: {}", config.level);
    Ok(guards)
}

/// Build environment filter from configuration
fn build_env_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let mut filter_string = config.level.clone();

    // RUST_LOG directives refine the configured level
    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        if !rust_log.is_empty() {
            filter_string.push(',');
            filter_string.push_str(&rust_log);
        }
    }

    Ok(EnvFilter::try_new(filter_string)?)
}

/// Initialize logging for testing
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .try_init();
}

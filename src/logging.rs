//! Structured logging setup.
//!
//! Everything in the crate logs through `tracing`. This module installs the
//! subscriber: an `EnvFilter`, a JSON or pretty `fmt` layer, and a non-blocking
//! writer to stdout or to the handler's log file.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    /// Log format: json/pretty
    pub format: LogFormat,
    /// Log file; stdout when unset
    pub log_path: Option<PathBuf>,
    /// Extra filter directives (comma-separated, e.g. `jsonrest::trace=debug`)
    pub target_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            log_path: None,
            target_filter: None,
        }
    }
}

impl LogConfig {
    /// Reads `JSONREST_LOG_LEVEL`, `JSONREST_LOG_FORMAT`, `JSONREST_LOG_PATH` and
    /// `JSONREST_LOG_TARGET_FILTER`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("JSONREST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("JSONREST_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            log_path: env::var_os("JSONREST_LOG_PATH").map(PathBuf::from),
            target_filter: env::var("JSONREST_LOG_TARGET_FILTER").ok(),
        }
    }

    /// Verbose pretty output on stdout.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            log_path: None,
            target_filter: None,
        }
    }

    /// Uses `path` unless a log path is already set.
    #[must_use]
    pub fn or_log_path(mut self, path: impl AsRef<Path>) -> Self {
        if self.log_path.is_none() {
            self.log_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',') {
                let filter = filter.trim();
                if filter.is_empty() {
                    continue;
                }
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
                }
            }
        }
        env_filter
    }
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive for as long as the process logs; dropping it
/// flushes and stops the background writer.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a global subscriber is
/// already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<WorkerGuard> {
    let (writer, guard) = match &config.log_path {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("log path {} has no file name", path.display()))?;
            std::fs::create_dir_all(directory).with_context(|| {
                format!("Failed to create log directory {}", directory.display())
            })?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name))
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Installs logging configured from the environment.
///
/// # Errors
///
/// See [`init_logging_with_config`].
pub fn init_logging() -> Result<WorkerGuard> {
    init_logging_with_config(&LogConfig::from_env())
}

//! Structured logging setup.
//!
//! Everything in this crate logs through `tracing`; this module installs a
//! subscriber for binaries and tests that want the output. Configuration comes
//! from the environment:
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `KINDROUTER_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `KINDROUTER_LOG_FORMAT` | json/pretty | `json` |
//! | `KINDROUTER_LOG_TARGET_FILTER` | comma-separated directives | none |
//! | `KINDROUTER_LOG_INCLUDE_LOCATION` | true/false | `false` |
//! | `KINDROUTER_LOG_ASYNC` | true/false | `false` |
//!
//! `RUST_LOG`, when set, takes precedence over the level.

use std::env;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// JSON for production, pretty-print for development.
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, comma-separated.
    pub target_filter: Option<String>,
    pub include_location: bool,
    /// Write through a background thread instead of blocking the caller.
    pub async_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
            include_location: false,
            async_logging: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| lookup(name).and_then(|s| s.parse().ok());
        let defaults = Self::default();
        Self {
            log_level: lookup("KINDROUTER_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("KINDROUTER_LOG_FORMAT").map_or(defaults.format, |s| LogFormat::parse(&s)),
            target_filter: lookup("KINDROUTER_LOG_TARGET_FILTER"),
            include_location: flag("KINDROUTER_LOG_INCLUDE_LOCATION")
                .unwrap_or(defaults.include_location),
            async_logging: flag("KINDROUTER_LOG_ASYNC").unwrap_or(defaults.async_logging),
        }
    }

    /// Verbose, human-readable output for local work.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Self::default()
        }
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

    fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let parsed = directive
                    .parse()
                    .with_context(|| format!("invalid log filter directive: {directive}"))?;
                filter = filter.add_directive(parsed);
            }
        }
        Ok(filter)
    }
}

/// Install a global subscriber from the environment, overriding the level.
///
/// ```no_run
/// let _guard = kindrouter::logging::init_logging("info").expect("logging");
/// ```
pub fn init_logging(log_level: &str) -> Result<Option<WorkerGuard>> {
    let mut config = LogConfig::from_env();
    config.log_level = log_level.to_string();
    init_logging_with_config(&config)
}

/// Install a global subscriber.
///
/// With async logging the returned guard flushes pending output when dropped;
/// keep it alive for the life of the process.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.env_filter()?;
    let (writer, guard) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize logging")?;
    Ok(guard)
}

//! Structured logging setup.
//!
//! Stdout logging in pretty, compact or JSON form, optionally mirrored to a
//! daily-rotated JSON file through a non-blocking writer.
//!
//! # Component Targets
//!
//! | Target | Description |
//! |--------|-------------|
//! | `distributor::cycle` | Cycle lifecycle and totals |
//! | `distributor::allocation` | Per-holder allocation decisions |
//! | `distributor::scheduler` | Batches and per-order outcomes |
//! | `distributor::gateway` | DLN requests, retries, fallback |
//! | `distributor::chain` | Balance queries and broadcasts |
//! | `distributor::holders` | Holder fetching and filtering |
//! | `distributor::server` | HTTP endpoints and timer |
//! | `distributor::http` | Raw outbound requests |
//!
//! ```bash
//! # Retry details only
//! RUST_LOG=info,distributor::gateway=debug cargo run -- serve
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON format (best for log aggregation)
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{other}' (pretty, json, compact)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LogConfig {
    /// Default level when RUST_LOG is not set
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for the rotated JSON log file; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "distributor.log".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            log_dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

impl LogConfig {
    /// JSON to stdout and a daily file in `log_dir`.
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            format: LogFormat::Json,
            log_dir: Some(log_dir),
            ..Default::default()
        }
    }
}

fn base_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(level);
        for directive in ["hyper=warn", "reqwest=warn", "alloy=warn", "h2=warn"] {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    })
}

/// Initialize the global subscriber.
///
/// The returned guard (if any) must live as long as the program or buffered
/// file logs are lost.
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = base_filter(&config.level);

    if let Some(ref log_dir) = config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .with_filter(base_filter(&config.level));

        match config.format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(file_layer)
                .with(fmt::layer().json().with_filter(filter))
                .init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(file_layer)
                .with(fmt::layer().compact().with_filter(filter))
                .init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(file_layer)
                .with(fmt::layer().with_target(false).with_filter(filter))
                .init(),
        }

        eprintln!("File logging enabled: {}", log_dir.display());
        return Ok(Some(guard));
    }

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }

    Ok(None)
}

/// Log target constants for component-specific logging.
///
/// ```ignore
/// tracing::debug!(target: targets::GATEWAY, host = %host, "Falling back");
/// ```
pub mod targets {
    pub const CYCLE: &str = "distributor::cycle";
    pub const ALLOCATION: &str = "distributor::allocation";
    pub const SCHEDULER: &str = "distributor::scheduler";
    pub const GATEWAY: &str = "distributor::gateway";
    pub const CHAIN: &str = "distributor::chain";
    pub const HOLDERS: &str = "distributor::holders";
    pub const SERVER: &str = "distributor::server";
    pub const HTTP: &str = "distributor::http";
}

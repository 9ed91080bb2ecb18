//! Logging setup for Proplink
//!
//! Installs a global tracing subscriber with an env filter and either a
//! human-readable or a JSON formatter.

use proplink_core::{LoggingConfig, ProplinkError, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Chatty dependencies held at `warn` regardless of the configured level
const QUIET_TARGETS: [&str; 3] = ["hyper=warn", "reqwest=warn", "h2=warn"];

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to use JSON format
    pub json_format: bool,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include file/line information
    pub with_file_info: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamps: true,
            with_file_info: false,
        }
    }
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            json_format: config.json,
            ..Default::default()
        }
    }
}

/// Initialize the global logger with the given configuration
pub fn init_logger(config: LoggerConfig) -> Result<()> {
    let level = LogLevel::parse(&config.level)?;

    let mut env_filter = EnvFilter::from_default_env().add_directive(level.into());
    for target in QUIET_TARGETS {
        let directive = target.parse().map_err(|e| {
            ProplinkError::validation(format!("Invalid log directive '{}': {}", target, e))
        })?;
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .boxed()
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info);

        if config.with_timestamps {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ProplinkError::validation(format!("Failed to initialize logger: {}", e)))?;

    tracing::info!("Logger initialized with level: {}", config.level);
    Ok(())
}

/// Initialize logger for testing (reduces noise)
pub fn init_test_logger() -> Result<()> {
    let config = LoggerConfig {
        level: "warn".to_string(),
        with_timestamps: false,
        ..Default::default()
    };

    // Ignore errors if already initialized
    let _ = init_logger(config);
    Ok(())
}

/// Overlay `PROPLINK_LOG_*` environment variables onto `base`
pub fn logger_config_from_env(base: LoggerConfig) -> LoggerConfig {
    LoggerConfig {
        level: std::env::var("PROPLINK_LOG_LEVEL").unwrap_or(base.level),
        json_format: std::env::var("PROPLINK_LOG_JSON")
            .map(|v| v.parse().unwrap_or(base.json_format))
            .unwrap_or(base.json_format),
        with_timestamps: std::env::var("PROPLINK_LOG_TIMESTAMPS")
            .map(|v| v.parse().unwrap_or(base.with_timestamps))
            .unwrap_or(base.with_timestamps),
        with_file_info: std::env::var("PROPLINK_LOG_FILE_INFO")
            .map(|v| v.parse().unwrap_or(base.with_file_info))
            .unwrap_or(base.with_file_info),
    }
}

/// Log level utilities
pub struct LogLevel;

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level: &str) -> Result<Level> {
        Level::from_str(level)
            .map_err(|e| ProplinkError::validation(format!("Invalid log level '{}': {}", level, e)))
    }

    /// Check if a log level string is valid
    pub fn is_valid(level: &str) -> bool {
        Self::parse(level).is_ok()
    }
}

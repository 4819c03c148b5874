//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and one
//! formatting layer chosen by [`LogFormat`].

use std::io::IsTerminal;

use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config;

/// Filter applied when none is configured and `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,keyward_server=debug";

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard single-line format
    /// Output: `2025-01-15T10:30:45.123456Z  INFO message key=value`
    Full,
    /// Human-readable multi-line format with colors
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format (for production log aggregation)
    Json,
}

impl LogFormat {
    /// Resolves the configured format. `auto` picks `Full` on a terminal and
    /// `Json` otherwise.
    #[must_use]
    pub fn resolve(configured: config::LogFormat) -> Self {
        match configured {
            config::LogFormat::Json => Self::Json,
            config::LogFormat::Text => Self::Full,
            config::LogFormat::Auto => {
                if std::io::stdout().is_terminal() {
                    Self::Full
                } else {
                    Self::Json
                }
            },
        }
    }
}

/// Configuration for logging behavior
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,
    /// Whether to include file/line numbers
    pub include_location: bool,
    /// Whether to include target module
    pub include_target: bool,
    /// Whether to log span events (new/close)
    pub log_spans: bool,
    /// Whether to use ANSI colors (None = auto-detect based on TTY)
    pub ansi: Option<bool>,
    /// Environment filter (e.g., "info,keyward_authn=debug")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Full,
            include_location: cfg!(debug_assertions),
            include_target: false,
            log_spans: false,
            ansi: None,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Builds the logging configuration for a server config.
    #[must_use]
    pub fn from_config(config: &config::Config) -> Self {
        let format = LogFormat::resolve(config.log_format);
        Self {
            format,
            include_target: format == LogFormat::Json,
            filter: Some(config.log_level.clone()),
            ..Default::default()
        }
    }
}

/// Builds the filter: the configured one, else `RUST_LOG`, else [`DEFAULT_FILTER`].
fn env_filter(config: &LogConfig) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    match &config.filter {
        Some(filter) => EnvFilter::try_new(filter),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Initialize structured logging
///
/// # Errors
///
/// Returns an error if the filter string is invalid or a global subscriber
/// is already installed.
///
/// # Examples
///
/// ```no_run
/// use keyward_server::logging::{LogConfig, LogFormat, init_logging};
///
/// init_logging(LogConfig {
///     format: LogFormat::Json,
///     filter: Some("info".to_string()),
///     ..Default::default()
/// })
/// .unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = env_filter(&config)?;
    let ansi = config.ansi.unwrap_or_else(|| std::io::stdout().is_terminal());
    let fmt_span = if config.log_spans { FmtSpan::NEW | FmtSpan::CLOSE } else { FmtSpan::NONE };

    match config.format {
        LogFormat::Full => {
            let fmt_layer = fmt::layer()
                .with_ansi(ansi)
                .with_target(config.include_target)
                .with_span_events(fmt_span)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        },
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_ansi(ansi)
                .with_target(config.include_target)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_span_events(fmt_span)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        },
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_ansi(ansi)
                .with_target(config.include_target)
                .with_span_events(fmt_span)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        },
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(config.include_target)
                .with_current_span(true)
                .with_span_list(true)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        },
    }

    tracing::debug!(format = ?config.format, ansi, "Logging initialized");

    Ok(())
}

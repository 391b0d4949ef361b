//! Tracing setup for slotbook
//!
//! One place to configure `tracing-subscriber` for the CLI and for services
//! embedding the engine.
//!
//! ```ignore
//! use slotbook_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli(false))?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crate targets that receive the configured default level.
const SLOTBOOK_TARGETS: [&str; 4] = [
    "slotbook_core",
    "slotbook_providers",
    "slotbook_engine",
    "slotbook",
];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Compact single-line format (default)
    #[default]
    Compact,
    /// Multi-line human-readable format
    Pretty,
    /// JSON lines, for log shipping from a service
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to slotbook crates when `RUST_LOG` is not set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Whether to include file/line information
    pub include_location: bool,
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Custom env filter directive, overrides both `RUST_LOG` and `default_level`
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Config for the command-line tool. Quiet unless `debug` is set.
    #[must_use]
    pub fn cli(debug: bool) -> Self {
        Self {
            default_level: if debug { Level::DEBUG } else { Level::WARN },
            output_format: TracingOutputFormat::Compact,
            include_location: debug,
            include_target: debug,
            include_timestamp: false,
            env_filter: None,
        }
    }

    /// Config for a long-running service embedding the engine.
    #[must_use]
    pub fn service() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Json,
            include_location: true,
            include_target: true,
            include_timestamp: true,
            env_filter: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The filter directive used when neither `env_filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        let level = self.default_level.as_str().to_lowercase();
        SLOTBOOK_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref filter) = self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(self.default_directive())?),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or if the
/// filter directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = config.build_filter()?;

    let layer = fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Json, _) => layer.json().boxed(),
        (TracingOutputFormat::Pretty, _) => layer.pretty().boxed(),
        (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
        (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_config_is_quiet_by_default() {
        let config = TracingConfig::cli(false);
        assert_eq!(config.default_level, Level::WARN);
        assert!(!config.include_timestamp);

        let debug = TracingConfig::cli(true);
        assert_eq!(debug.default_level, Level::DEBUG);
        assert!(debug.include_location);
    }

    #[test]
    fn service_config_logs_json() {
        let config = TracingConfig::service();
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.default_level, Level::INFO);
    }

    #[test]
    fn default_directive_covers_all_crates() {
        let directive = TracingConfig::default()
            .with_level(Level::TRACE)
            .default_directive();
        assert_eq!(
            directive,
            "slotbook_core=trace,slotbook_providers=trace,slotbook_engine=trace,slotbook=trace"
        );
    }

    #[test]
    fn explicit_filter_wins() {
        let config = TracingConfig::default().with_env_filter("slotbook_engine=debug");
        assert_eq!(config.env_filter.as_deref(), Some("slotbook_engine=debug"));
        assert!(config.build_filter().is_ok());
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = TracingConfig::default().with_env_filter("slotbook=[");
        assert!(matches!(
            config.build_filter(),
            Err(TracingError::EnvFilter(_))
        ));
    }
}

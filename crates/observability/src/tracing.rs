//! Tracing subscriber initialization.
//!
//! Configuration comes from the environment:
//! - `RUST_LOG`: filter directives (default `info`)
//! - `UOMSYNC_LOG_FORMAT`: `json` (default), `pretty` or `compact`

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "UOMSYNC_LOG_FORMAT";
const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Json,
        }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        let filter = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = std::env::var(LOG_FORMAT_ENV)
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();
        Self { filter, format }
    }
}

/// Initialize tracing from the environment. Subsequent calls are no-ops.
pub fn init() {
    init_with(&ObservabilityConfig::from_env());
}

/// Initialize tracing with an explicit configuration. Subsequent calls are no-ops.
pub fn init_with(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    // try_init fails once a global subscriber exists; that is the no-op path.
    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if installed.is_ok() {
        ::tracing::debug!(filter = %config.filter, format = ?config.format, "tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parse_is_lenient() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(" compact "), LogFormat::Compact);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = ObservabilityConfig {
            filter: "debug".to_string(),
            format: LogFormat::Compact,
        };
        init_with(&config);
        init_with(&config);
    }

    #[test]
    fn bad_filter_falls_back_to_default() {
        let config = ObservabilityConfig {
            filter: "[[[".to_string(),
            format: LogFormat::Json,
        };
        init_with(&config);
    }
}

//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use dispatcher::DispatcherConfig;

use crate::error::ConfigError;

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownLogFormat(s.to_string())),
        }
    }
}

/// Runtime configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `SLOW_HANDLER_MS`: slow handler warning threshold (default: `250`)
/// - `QUEUE_WARN_DEPTH`: queue depth warning threshold (default: `1024`)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub slow_handler_ms: u64,
    pub queue_warn_depth: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT") {
                Some(format) => format.parse()?,
                None => defaults.log_format,
            },
            slow_handler_ms: parse_number(&lookup, "SLOW_HANDLER_MS")?
                .unwrap_or(defaults.slow_handler_ms),
            queue_warn_depth: parse_number(&lookup, "QUEUE_WARN_DEPTH")?
                .unwrap_or(defaults.queue_warn_depth),
        })
    }

    /// Thresholds handed to each dispatcher.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            slow_handler_threshold: Duration::from_millis(self.slow_handler_ms),
            queue_warn_depth: self.queue_warn_depth,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            slow_handler_ms: 250,
            queue_warn_depth: 1024,
        }
    }
}

fn parse_number<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key, value: raw })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.slow_handler_ms, 250);
        assert_eq!(config.queue_warn_depth, 1024);
    }

    #[test]
    fn test_empty_lookup_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.slow_handler_ms, 250);
    }

    #[test]
    fn test_values_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("RUST_LOG", "debug,dispatcher=trace"),
            ("LOG_FORMAT", "JSON"),
            ("SLOW_HANDLER_MS", "50"),
            ("QUEUE_WARN_DEPTH", "8"),
        ]))
        .unwrap();

        assert_eq!(config.log_level, "debug,dispatcher=trace");
        assert_eq!(config.log_format, LogFormat::Json);

        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.slow_handler_threshold, Duration::from_millis(50));
        assert_eq!(dispatcher.queue_warn_depth, 8);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[("SLOW_HANDLER_MS", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                key: "SLOW_HANDLER_MS",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let err = Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLogFormat(_)));
    }
}

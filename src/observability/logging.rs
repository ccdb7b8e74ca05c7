//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const ENV_LOG_FILTER: &str = "COOKBOOK_LOG";
const ENV_LOG_FORMAT: &str = "COOKBOOK_LOG_FORMAT";
const ENV_LOG_FILE: &str = "COOKBOOK_LOG_FILE";

const DEFAULT_FILTER: &str = "cookbook=info";
const VERBOSE_FILTER: &str = "cookbook=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; unknown names yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// The filter comes from `COOKBOOK_LOG`, then `RUST_LOG`, then the config
    /// file. `verbose` raises the default to debug when none of those is set.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        Self::from_lookup(settings, verbose, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        settings: Option<&LoggingSettings>,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let format = lookup(ENV_LOG_FORMAT)
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .and_then(|value| LogFormat::parse(&value))
            .unwrap_or_default();

        let file = lookup(ENV_LOG_FILE)
            .map(PathBuf::from)
            .or_else(|| settings.and_then(|s| s.file.clone()));

        let directive = lookup(ENV_LOG_FILTER)
            .or_else(|| lookup("RUST_LOG"))
            .or_else(|| settings.and_then(|s| s.filter.clone()));
        let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
        let filter = directive
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| EnvFilter::new(fallback));

        Self {
            format,
            filter,
            file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", Some(LogFormat::Json))]
    #[test_case(" Pretty ", Some(LogFormat::Pretty))]
    #[test_case("xml", None)]
    fn test_parse_format(value: &str, expected: Option<LogFormat>) {
        assert_eq!(LogFormat::parse(value), expected);
    }

    #[test]
    fn test_env_beats_settings() {
        let settings = LoggingSettings {
            format: Some("pretty".to_string()),
            filter: Some("cookbook=warn".to_string()),
            file: Some(PathBuf::from("/tmp/from-settings.log")),
        };
        let config = LoggingConfig::from_lookup(Some(&settings), false, |key| match key {
            ENV_LOG_FORMAT => Some("json".to_string()),
            ENV_LOG_FILTER => Some("cookbook=trace".to_string()),
            _ => None,
        });

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/from-settings.log")));
        assert_eq!(config.filter.to_string(), "cookbook=trace");
    }

    #[test]
    fn test_verbose_default_filter() {
        let config = LoggingConfig::from_lookup(None, true, |_| None);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter.to_string(), VERBOSE_FILTER);
        assert!(config.file.is_none());
    }
}

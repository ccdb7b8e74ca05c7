//! Configuration management.
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! config file, `COOKBOOK_*` environment variables, and `with_*` builder
//! calls made by the binary for command-line flags.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "COOKBOOK_DATA_DIR";
/// Environment variable overriding the store file path.
pub const ENV_STORE_PATH: &str = "COOKBOOK_STORE_PATH";
/// Environment variable overriding the fixture directory.
pub const ENV_SEED_DIR: &str = "COOKBOOK_SEED_DIR";

const STORE_FILE_NAME: &str = "cookbook.db";

/// Main configuration for cookbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookbookConfig {
    /// Directory holding the store file.
    pub data_dir: PathBuf,
    /// Explicit store file; defaults to `cookbook.db` in `data_dir`.
    pub store_path: Option<PathBuf>,
    /// Fixture tree used to seed an empty store.
    pub seed_dir: Option<PathBuf>,
    /// Search behaviour.
    pub search: SearchConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Search configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Quiet period before a live query runs, in milliseconds.
    pub debounce_ms: u64,
    /// Maximum excerpt length, in characters.
    pub excerpt_len: usize,
    /// Maximum number of results shown by the CLI.
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            excerpt_len: crate::services::DEFAULT_EXCERPT_LEN,
            result_limit: 20,
        }
    }
}

/// Logging settings as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Output format: "pretty" or "json".
    pub format: Option<String>,
    /// Filter directive, e.g. `cookbook=debug`.
    pub filter: Option<String>,
    /// Log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Store file path.
    pub store_path: Option<String>,
    /// Fixture directory.
    pub seed_dir: Option<String>,
    /// Search section.
    pub search: Option<ConfigFileSearch>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Search section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSearch {
    /// Debounce in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Excerpt length.
    pub excerpt_len: Option<usize>,
    /// Result limit.
    pub result_limit: Option<usize>,
}

impl Default for CookbookConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_path: None,
            seed_dir: None,
            search: SearchConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cookbook"),
        |dirs| dirs.data_dir().join("cookbook"),
    )
}

impl CookbookConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::operation("read_config_file", e))?;
        Self::parse(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid config TOML.
    pub fn parse(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::operation("parse_config_file", e))?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/cookbook/`. Returns
    /// defaults if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("cookbook").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("cookbook")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|path| path.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.store_path = file.store_path.map(PathBuf::from);
        config.seed_dir = file.seed_dir.map(PathBuf::from);
        if let Some(search) = file.search {
            if let Some(v) = search.debounce_ms {
                config.search.debounce_ms = v;
            }
            if let Some(v) = search.excerpt_len {
                config.search.excerpt_len = v;
            }
            if let Some(v) = search.result_limit {
                config.search.result_limit = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies `COOKBOOK_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies `COOKBOOK_*` overrides from `lookup`.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key| lookup(key).filter(|value: &String| !value.trim().is_empty());
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(ENV_STORE_PATH) {
            self.store_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(ENV_SEED_DIR) {
            self.seed_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the store file path.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Sets the fixture directory.
    #[must_use]
    pub fn with_seed_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_dir = Some(path.into());
        self
    }

    /// The store file to open.
    #[must_use]
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(STORE_FILE_NAME))
    }

    /// The live search debounce interval.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = CookbookConfig::parse(
            r#"
            data_dir = "/var/lib/cookbook"
            seed_dir = "/usr/share/cookbook/fixtures"

            [search]
            debounce_ms = 250
            result_limit = 5

            [logging]
            format = "json"
            filter = "cookbook=debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/cookbook"));
        assert_eq!(
            config.resolved_store_path(),
            PathBuf::from("/var/lib/cookbook/cookbook.db")
        );
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.search.result_limit, 5);
        assert_eq!(
            config.search.excerpt_len,
            SearchConfig::default().excerpt_len
        );
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(CookbookConfig::parse("data_dir = [").is_err());
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let config = CookbookConfig::new()
            .with_store_path("/from/file.db")
            .with_overrides_from(|key| match key {
                ENV_STORE_PATH => Some("/from/env.db".to_string()),
                ENV_SEED_DIR => Some("   ".to_string()),
                _ => None,
            });

        assert_eq!(config.resolved_store_path(), PathBuf::from("/from/env.db"));
        assert_eq!(config.seed_dir, None);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CookbookConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
    }
}

//! Configuration system for executor-state
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (EXECUTOR_STATE_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default configuration file name searched in the working directory
pub const CONFIG_FILE_NAME: &str = "executor-state.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Logging configuration
    pub logging: LoggingSettings,

    /// Executor cache limits
    pub cache: CacheSettings,

    /// Debounce defaults
    pub debounce: DebounceSettings,

    /// Demo scenario settings
    pub demo: DemoSettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Executor cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum live executors (0 = unbounded)
    pub max_entries: usize,
}

/// Debounce settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceSettings {
    /// Default delay in milliseconds
    pub delay_ms: u64,
}

/// Demo scenario settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Simulated latency of deferred work in milliseconds
    pub delay_ms: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { max_entries: 256 }
    }
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self { delay_ms: 300 }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self { delay_ms: 50 }
    }
}

impl Settings {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut settings = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            settings = toml::from_str(&content).map_err(|e| {
                Error::config_parse(format!("{}: {}", path.display(), e), Some(e))
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        settings.apply_env_overrides();

        // 3. Expand paths
        settings.expand_paths();

        // 4. Validate
        settings.validate()?;

        Ok(settings)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            dirs::config_dir()
                .map(|p| p.join("executor-state").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".executor-state").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if path.is_file() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    pub(crate) fn apply_env_overrides(&mut self) {
        // Logging settings
        if let Ok(val) = std::env::var("EXECUTOR_STATE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("EXECUTOR_STATE_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("EXECUTOR_STATE_LOG_JSON") {
            self.logging.json_format = parse_flag(&val);
        }

        // Cache settings
        if let Ok(val) = std::env::var("EXECUTOR_STATE_CACHE_MAX_ENTRIES") {
            if let Ok(n) = val.parse() {
                self.cache.max_entries = n;
            }
        }

        // Debounce settings
        if let Ok(val) = std::env::var("EXECUTOR_STATE_DEBOUNCE_MS") {
            if let Ok(n) = val.parse() {
                self.debounce.delay_ms = n;
            }
        }

        // Demo settings
        if let Ok(val) = std::env::var("EXECUTOR_STATE_DEMO_DELAY_MS") {
            if let Ok(n) = val.parse() {
                self.demo.delay_ms = n;
            }
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if self.logging.max_files == 0 {
            return Err(Error::config_field_invalid(
                "logging.max_files",
                "max_files must be at least 1",
            ));
        }

        if self.debounce.delay_ms == 0 {
            return Err(Error::config_field_invalid(
                "debounce.delay_ms",
                "delay_ms must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".executor-state")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate the default configuration with comments
fn generate_default_config() -> String {
    r#"# executor-state configuration
#
# Environment variables (EXECUTOR_STATE_*) override these values.

[logging]
# Log level: trace, debug, info, warn, error
level = "info"
# Optional log file (rotated)
# file = "~/.executor-state/logs/executor-state.log"
max_file_size_mb = 100
max_files = 5
json_format = false

[cache]
# Maximum live executors per cache (0 = unbounded)
max_entries = 256

[debounce]
# Default debounce delay in milliseconds
delay_ms = 300

[demo]
# Simulated latency of deferred work in demo scenarios
delay_ms = 50
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let settings = Settings::default();
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.cache.max_entries, 256);
        assert_eq!(settings.debounce.delay_ms, 300);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        env::set_var("EXECUTOR_STATE_CACHE_MAX_ENTRIES", "8");
        env::set_var("EXECUTOR_STATE_DEMO_DELAY_MS", "5");

        let mut settings = Settings::default();
        settings.apply_env_overrides();

        assert_eq!(settings.cache.max_entries, 8);
        assert_eq!(settings.demo.delay_ms, 5);

        env::remove_var("EXECUTOR_STATE_CACHE_MAX_ENTRIES");
        env::remove_var("EXECUTOR_STATE_DEMO_DELAY_MS");
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "invalid".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_zero_debounce() {
        let mut settings = Settings::default();
        settings.debounce.delay_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_config_file_parses() {
        let parsed: Settings = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(parsed.cache.max_entries, 256);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let parsed: Settings = toml::from_str(
            r#"
[logging]
level = "debug"

[cache]
max_entries = 0
"#,
        )
        .unwrap();

        assert_eq!(parsed.logging.level, "debug");
        assert_eq!(parsed.cache.max_entries, 0);
        assert_eq!(parsed.debounce.delay_ms, 300);
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let path_str = path.to_str().unwrap();

        let created = init_config(Some(path_str), false).unwrap();
        assert!(created.exists());
        assert!(init_config(Some(path_str), false).is_err());
        assert!(init_config(Some(path_str), true).is_ok());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Settings::load(Some("/nonexistent/executor-state.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }
}

//! Configuration loading using Figment.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (`ScopeConfig::default()`)
//! 2. A TOML file (`config/scope.toml` unless a path is given; a missing file is skipped)
//! 3. Environment variables prefixed with `SCOPE_DAQ_`, using `__` to separate sections
//!
//! # Example
//! ```no_run
//! use scope_daq::config::ScopeConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // SCOPE_DAQ_CAPTURE__POLL_INTERVAL_MS=5 overrides capture.poll_interval_ms
//! let config = ScopeConfig::load()?;
//! println!("Capture thread: {}", config.capture.thread_name);
//! # Ok(())
//! # }
//! ```

use crate::error::{AppResult, ScopeError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/scope.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "SCOPE_DAQ_";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Capture coordinator settings
    pub capture: CaptureConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "scope-daq".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Log output format as spelled in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// Single-line output
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Capture coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Sleep between "is data ready" polls, in milliseconds
    pub poll_interval_ms: u64,
    /// OS-level name of the capture thread
    pub thread_name: String,
    /// How long the render loop waits for a waveform before redrawing anyway
    pub ready_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            thread_name: "WaveformThread".to_string(),
            ready_timeout_ms: 100,
        }
    }
}

impl CaptureConfig {
    /// Poll retry interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Consumer-side wait bound as a `Duration`.
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

impl ScopeConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path and environment, then validate it.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Self::figment(Some(path.as_ref())).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack used by [`load_from`](Self::load_from).
    ///
    /// Exposed so callers can merge further providers (e.g. CLI overrides) before extracting.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        if !VALID_LEVELS.contains(&self.application.log_level.as_str()) {
            return Err(ScopeError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LEVELS.join(", ")
            )));
        }

        if self.capture.poll_interval_ms == 0 {
            return Err(ScopeError::Configuration(
                "capture.poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.capture.thread_name.trim().is_empty() {
            return Err(ScopeError::Configuration(
                "capture.thread_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScopeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.capture.thread_name, "WaveformThread");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = ScopeConfig::default();
        config.application.log_level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid log_level 'verbose'"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = ScopeConfig::default();
        config.capture.poll_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ScopeError::Configuration(_))
        ));
    }

    #[test]
    fn test_blank_thread_name_rejected() {
        let mut config = ScopeConfig::default();
        config.capture.thread_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScopeConfig = toml::from_str(
            r#"
            [capture]
            poll_interval_ms = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.capture.poll_interval_ms, 4);
        assert_eq!(config.capture.ready_timeout_ms, 100);
        assert_eq!(config.application.log_format, LogFormat::Pretty);
    }
}

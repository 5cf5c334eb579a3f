//! Integration tests for layered configuration loading.
//!
//! Every test that loads configuration is `#[serial]`: environment overrides are
//! process-wide.

use scope_daq::config::{LogFormat, ScopeConfig};
use scope_daq::ScopeError;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config");
    file
}

#[test]
#[serial]
fn test_load_from_file() {
    let file = write_config(
        r#"
        [application]
        name = "bench scope"
        log_level = "debug"
        log_format = "json"

        [capture]
        poll_interval_ms = 5
        thread_name = "Capture"
        ready_timeout_ms = 250
    "#,
    );

    let config = ScopeConfig::load_from(file.path()).unwrap();
    assert_eq!(config.application.name, "bench scope");
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.log_format, LogFormat::Json);
    assert_eq!(config.capture.poll_interval(), Duration::from_millis(5));
    assert_eq!(config.capture.thread_name, "Capture");
    assert_eq!(config.capture.ready_timeout(), Duration::from_millis(250));
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
        [capture]
        ready_timeout_ms = 40
    "#,
    );

    let config = ScopeConfig::load_from(file.path()).unwrap();
    assert_eq!(config.capture.ready_timeout_ms, 40);
    assert_eq!(config.capture.poll_interval_ms, 1);
    assert_eq!(config.capture.thread_name, "WaveformThread");
    assert_eq!(config.application.log_level, "info");
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScopeConfig::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ScopeConfig::default());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_config(
        r#"
        [capture]
        poll_interval_ms = 5
    "#,
    );

    std::env::set_var("SCOPE_DAQ_CAPTURE__POLL_INTERVAL_MS", "7");
    let result = ScopeConfig::load_from(file.path());
    std::env::remove_var("SCOPE_DAQ_CAPTURE__POLL_INTERVAL_MS");

    let config = result.unwrap();
    assert_eq!(config.capture.poll_interval_ms, 7);
}

#[test]
#[serial]
fn test_malformed_file_is_rejected() {
    let file = write_config(
        r#"
        [capture]
        poll_interval_ms = "fast"
    "#,
    );

    let err = ScopeConfig::load_from(file.path()).unwrap_err();
    assert!(matches!(err, ScopeError::Config(_)), "unexpected error: {err}");
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    let zero_interval = write_config(
        r#"
        [capture]
        poll_interval_ms = 0
    "#,
    );
    let err = ScopeConfig::load_from(zero_interval.path()).unwrap_err();
    assert!(matches!(err, ScopeError::Configuration(_)));
    assert!(err.to_string().contains("poll_interval_ms"));

    let bad_level = write_config(
        r#"
        [application]
        log_level = "loud"
    "#,
    );
    let err = ScopeConfig::load_from(bad_level.path()).unwrap_err();
    assert!(err.to_string().contains("loud"));
}

#[test]
#[serial]
fn test_resolved_config_round_trips_through_toml() {
    let config = ScopeConfig::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    assert!(rendered.contains("thread_name = \"WaveformThread\""));

    let file = write_config(&rendered);
    assert_eq!(ScopeConfig::load_from(file.path()).unwrap(), config);
}

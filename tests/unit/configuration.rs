//! Unit tests for configuration loading, defaults, and validation.

use std::fs;

use calcprobe::config::{
    load_checked_config, validate_config_version, Config, ConfigError, SUPPORTED_CONFIG_VERSION,
};
use tempfile::TempDir;

use super::common::{run_async_test, ConfigYaml};

fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("calcprobe.yaml");
    fs::write(&path, yaml).expect("write test configuration");
    path
}

#[test]
fn default_configuration_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.version, SUPPORTED_CONFIG_VERSION);
    assert_eq!(config.target.base_url, "http://127.0.0.1:8000");
    assert_eq!(config.target.request_timeout_ms, 10_000);
    assert_eq!(config.target.wait_budget_ms, 5_000);
    assert_eq!(config.target.poll_interval_ms, 250);
    assert_eq!(config.credentials.username, "test@test.com");
    assert_eq!(config.credentials.password, "password");
}

#[test]
fn full_configuration_loads() {
    run_async_test(|| async {
        let dir = TempDir::new().expect("create temp dir");
        let yaml = ConfigYaml::new()
            .with_base_url("http://127.0.0.1:9999")
            .with_username("probe@example.com")
            .to_yaml();
        let path = write_config(&dir, &yaml);

        let config = load_checked_config(&path).await.expect("load configuration");
        assert_eq!(config.target.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.target.request_timeout_ms, 5000);
        assert_eq!(config.credentials.username, "probe@example.com");
        assert_eq!(config.credentials.password, "password");
    });
}

#[test]
fn omitted_sections_fall_back_to_defaults() {
    run_async_test(|| async {
        let dir = TempDir::new().expect("create temp dir");
        let path = write_config(&dir, "version: 1\n");

        let config = load_checked_config(&path).await.expect("load configuration");
        assert_eq!(config, Config::default());
    });
}

#[test]
fn missing_file_is_a_read_error() {
    run_async_test(|| async {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("absent.yaml");

        let err = load_checked_config(&path).await.expect_err("load must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    });
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    run_async_test(|| async {
        let dir = TempDir::new().expect("create temp dir");
        let path = write_config(&dir, "version: 1\ntarget: [not: a: mapping\n");

        let err = load_checked_config(&path).await.expect_err("load must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    });
}

#[test]
fn missing_version_is_rejected() {
    run_async_test(|| async {
        let dir = TempDir::new().expect("create temp dir");
        let yaml = ConfigYaml::new().without_version().to_yaml();
        let path = write_config(&dir, &yaml);

        let err = load_checked_config(&path).await.expect_err("load must fail");
        match err {
            ConfigError::Validation { source, .. } => {
                assert!(source.reasons()[0].contains("version is required"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    });
}

#[test]
fn unsupported_version_is_rejected() {
    run_async_test(|| async {
        let dir = TempDir::new().expect("create temp dir");
        let yaml = ConfigYaml::new().with_version("2").to_yaml();
        let path = write_config(&dir, &yaml);

        let err = load_checked_config(&path).await.expect_err("load must fail");
        match err {
            ConfigError::Validation { source, .. } => {
                assert!(source.reasons()[0].contains("version must equal 1"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    });
}

#[test]
fn non_numeric_version_is_rejected() {
    let document: serde_yaml::Value =
        serde_yaml::from_str("version: \"one\"\n").expect("parse yaml");
    let err = validate_config_version(&document).expect_err("version must be rejected");
    assert!(err.reasons()[0].contains("unsigned integer"));
}

#[test]
fn empty_base_url_is_rejected() {
    let mut config = Config::default();
    config.target.base_url = "  ".to_string();
    let err = config.validate().expect_err("validation must fail");
    assert!(err
        .reasons()
        .iter()
        .any(|r| r.contains("target.base_url must not be empty")));
}

#[test]
fn non_http_base_url_is_rejected() {
    let mut config = Config::default();
    config.target.base_url = "ftp://example.com".to_string();
    let err = config.validate().expect_err("validation must fail");
    assert!(err
        .reasons()
        .iter()
        .any(|r| r.contains("http or https scheme")));
}

#[test]
fn unparseable_base_url_is_rejected() {
    let mut config = Config::default();
    config.target.base_url = "not a url".to_string();
    let err = config.validate().expect_err("validation must fail");
    assert!(err
        .reasons()
        .iter()
        .any(|r| r.contains("not a valid URL")));
}

#[test]
fn zero_timings_are_rejected() {
    let mut config = Config::default();
    config.target.request_timeout_ms = 0;
    config.target.wait_budget_ms = 0;
    config.target.poll_interval_ms = 0;
    let err = config.validate().expect_err("validation must fail");
    let reasons = err.reasons();
    assert!(reasons
        .iter()
        .any(|r| r.contains("request_timeout_ms must be greater than zero")));
    assert!(reasons
        .iter()
        .any(|r| r.contains("wait_budget_ms must be greater than zero")));
    assert!(reasons
        .iter()
        .any(|r| r.contains("poll_interval_ms must be greater than zero")));
}

#[test]
fn poll_interval_must_fit_within_wait_budget() {
    let mut config = Config::default();
    config.target.wait_budget_ms = 100;
    config.target.poll_interval_ms = 500;
    let err = config.validate().expect_err("validation must fail");
    assert!(err
        .reasons()
        .iter()
        .any(|r| r.contains("must not exceed target.wait_budget_ms")));
}

#[test]
fn blank_credentials_are_rejected() {
    let mut config = Config::default();
    config.credentials.username = " ".to_string();
    config.credentials.password = String::new();
    let err = config.validate().expect_err("validation must fail");
    let reasons = err.reasons();
    assert!(reasons
        .iter()
        .any(|r| r.contains("credentials.username must not be empty")));
    assert!(reasons
        .iter()
        .any(|r| r.contains("credentials.password must not be empty")));
}

#[test]
fn initialize_falls_back_to_defaults_on_missing_file() {
    run_async_test(|| async {
        let dir = TempDir::new().expect("create temp dir");
        let config = calcprobe::config::initialize(Some(dir.path().join("absent.yaml"))).await;
        assert_eq!(config, Config::default());
    });
}

//! Configuration management for the calcprobe harness.
//!
//! Configuration is sourced from a YAML file on disk, validated before use,
//! with a default fallback applied when the file is missing or invalid. The
//! harness runs once per invocation, so there is no runtime reload.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// Default configuration file name used when no explicit path is provided.
pub const DEFAULT_CONFIG_PATH: &str = "calcprobe.yaml";

/// Supported configuration schema version.
pub const SUPPORTED_CONFIG_VERSION: u8 = 1;

/// Default base URL of the service under test.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default per-request HTTP timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default bound on waits for page conditions in milliseconds.
const DEFAULT_WAIT_BUDGET_MS: u64 = 5_000;

/// Default interval between page condition polls in milliseconds.
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

const DEFAULT_USERNAME: &str = "test@test.com";
const DEFAULT_PASSWORD: &str = "password";

// Serde requires functions for default values, not constants
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_wait_budget_ms() -> u64 {
    DEFAULT_WAIT_BUDGET_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_password() -> String {
    DEFAULT_PASSWORD.to_string()
}

/// Harness configuration shared across the application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: u8,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            target: TargetConfig::default(),
            credentials: Credentials::default(),
        }
    }
}

/// Location and timing parameters of the service under test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_wait_budget_ms")]
    pub wait_budget_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            wait_budget_ms: default_wait_budget_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Account used for the authenticated scenarios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
        }
    }
}

impl Config {
    /// Validate configuration invariants before the configuration becomes active.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        if self.version != SUPPORTED_CONFIG_VERSION {
            reasons.push(format!(
                "version must equal {}, got {}",
                SUPPORTED_CONFIG_VERSION, self.version
            ));
        }

        if self.target.base_url.trim().is_empty() {
            reasons.push("target.base_url must not be empty".to_string());
        } else {
            match reqwest::Url::parse(&self.target.base_url) {
                Ok(url) => {
                    let scheme = url.scheme();
                    if scheme != "http" && scheme != "https" {
                        reasons.push(format!(
                            "target.base_url must use http or https scheme, got: {}",
                            scheme
                        ));
                    }
                }
                Err(err) => {
                    reasons.push(format!("target.base_url is not a valid URL: {}", err));
                }
            }
        }

        if self.target.request_timeout_ms == 0 {
            reasons.push("target.request_timeout_ms must be greater than zero".to_string());
        }

        if self.target.wait_budget_ms == 0 {
            reasons.push("target.wait_budget_ms must be greater than zero".to_string());
        }

        if self.target.poll_interval_ms == 0 {
            reasons.push("target.poll_interval_ms must be greater than zero".to_string());
        } else if self.target.poll_interval_ms > self.target.wait_budget_ms {
            reasons.push(format!(
                "target.poll_interval_ms ({}) must not exceed target.wait_budget_ms ({})",
                self.target.poll_interval_ms, self.target.wait_budget_ms
            ));
        }

        if self.credentials.username.trim().is_empty() {
            reasons.push("credentials.username must not be empty".to_string());
        }

        if self.credentials.password.is_empty() {
            reasons.push("credentials.password must not be empty".to_string());
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { reasons })
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("configuration validation failed for {path}: {source}")]
    Validation {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

/// Validation failure containing the list of violated invariants.
#[derive(Debug, Error, Clone)]
#[error("configuration validation failed: {reasons:?}")]
pub struct ValidationError {
    reasons: Vec<String>,
}

impl ValidationError {
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }
}

/// Load configuration from disk, falling back to defaults when the file is
/// missing or invalid. The fallback keeps the harness usable against a locally
/// running service without any setup.
pub async fn initialize<P: Into<Option<PathBuf>>>(path: P) -> Config {
    let path = path
        .into()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    match load_checked_config(&path).await {
        Ok(config) => {
            info!(
                path = %path.display(),
                status = "applied",
                "Loaded configuration"
            );
            config
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "Using default configuration due to load failure"
            );
            Config::default()
        }
    }
}

/// Read, parse, and validate a configuration file.
pub async fn load_checked_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let document =
        serde_yaml::from_str::<serde_yaml::Value>(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if let Err(source) = validate_config_version(&document) {
        return Err(ConfigError::Validation {
            path: path.to_path_buf(),
            source,
        });
    }

    let config =
        serde_yaml::from_value::<Config>(document).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    config
        .validate()
        .map_err(|source| ConfigError::Validation {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(config)
}

/// Check the schema version before deserializing the full document, so a
/// future-versioned file is rejected with a clear reason rather than a field
/// level parse error.
pub fn validate_config_version(value: &serde_yaml::Value) -> Result<(), ValidationError> {
    let Some(mapping) = value.as_mapping() else {
        return Err(ValidationError {
            reasons: vec!["configuration root must be a mapping".to_string()],
        });
    };

    let Some(version_value) = mapping.get(serde_yaml::Value::String("version".to_string())) else {
        return Err(ValidationError {
            reasons: vec!["version is required and must be set to 1".to_string()],
        });
    };

    match version_value {
        serde_yaml::Value::Number(num) => {
            if let Some(actual) = num.as_u64() {
                if actual == SUPPORTED_CONFIG_VERSION as u64 {
                    return Ok(());
                }

                return Err(ValidationError {
                    reasons: vec![format!(
                        "version must equal {}, got {}",
                        SUPPORTED_CONFIG_VERSION, actual
                    )],
                });
            }

            Err(ValidationError {
                reasons: vec!["version must be an unsigned integer value".to_string()],
            })
        }
        _ => Err(ValidationError {
            reasons: vec!["version must be an unsigned integer value".to_string()],
        }),
    }
}

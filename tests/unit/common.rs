//! Shared utilities for unit tests of the calcprobe library.

#![allow(dead_code)]

use std::future::Future;

use tokio::runtime::Runtime;

/// Execute the provided async test body on a Tokio runtime.
pub fn run_async_test<F, Fut>(future: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    Runtime::new()
        .expect("create tokio runtime")
        .block_on(future());
}

/// YAML configuration field values for generating test configs.
#[derive(Debug, Clone)]
pub struct ConfigYaml {
    pub version: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub wait_budget_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ConfigYaml {
    fn default() -> Self {
        Self {
            version: Some("1".to_string()),
            base_url: Some("http://127.0.0.1:8000".to_string()),
            request_timeout_ms: Some(5000),
            wait_budget_ms: Some(2000),
            poll_interval_ms: Some(100),
            username: Some("test@test.com".to_string()),
            password: Some("password".to_string()),
        }
    }
}

impl ConfigYaml {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn without_version(mut self) -> Self {
        self.version = None;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_request_timeout_ms(mut self, value: u64) -> Self {
        self.request_timeout_ms = Some(value);
        self
    }

    pub fn with_wait_budget_ms(mut self, value: u64) -> Self {
        self.wait_budget_ms = Some(value);
        self
    }

    pub fn with_poll_interval_ms(mut self, value: u64) -> Self {
        self.poll_interval_ms = Some(value);
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Generate the YAML configuration string.
    pub fn to_yaml(&self) -> String {
        let mut yaml = String::new();
        if let Some(version) = &self.version {
            yaml.push_str(&format!("version: {}\n", version));
        }

        if self.base_url.is_some()
            || self.request_timeout_ms.is_some()
            || self.wait_budget_ms.is_some()
            || self.poll_interval_ms.is_some()
        {
            yaml.push_str("\ntarget:\n");
            if let Some(base_url) = &self.base_url {
                yaml.push_str(&format!("  base_url: \"{}\"\n", base_url));
            }
            if let Some(timeout) = self.request_timeout_ms {
                yaml.push_str(&format!("  request_timeout_ms: {}\n", timeout));
            }
            if let Some(budget) = self.wait_budget_ms {
                yaml.push_str(&format!("  wait_budget_ms: {}\n", budget));
            }
            if let Some(poll) = self.poll_interval_ms {
                yaml.push_str(&format!("  poll_interval_ms: {}\n", poll));
            }
        }

        if self.username.is_some() || self.password.is_some() {
            yaml.push_str("\ncredentials:\n");
            if let Some(username) = &self.username {
                yaml.push_str(&format!("  username: \"{}\"\n", username));
            }
            if let Some(password) = &self.password {
                yaml.push_str(&format!("  password: \"{}\"\n", password));
            }
        }

        yaml
    }
}

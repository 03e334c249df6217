//! Suite configuration
//!
//! Layered as: built-in defaults, an optional TOML file, then overrides
//! from the harness command line (which also reads `APP_PORT` / `APP_URL`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connector::RetryPolicy;
use crate::error::{E2eError, E2eResult};
use crate::playwright::{Browser, PlaywrightConfig};

pub const DEFAULT_PORT: u16 = 9999;

/// Suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Full base address of the application. Takes precedence over host/port.
    pub base_url: Option<String>,

    pub host: String,

    pub port: u16,

    /// Connection retry settings
    pub connect: ConnectConfig,

    /// Browser settings
    pub browser: BrowserConfig,

    /// Directory holding the YAML scenarios
    pub specs_dir: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect: ConnectConfig::default(),
            browser: BrowserConfig::default(),
            specs_dir: PathBuf::from("crates/e2e/tests/specs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            delay_ms: RetryPolicy::DEFAULT_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Explicit-wait budget for visibility checks
    pub wait_timeout_ms: u64,

    /// Directory Node resolves `playwright` from
    pub node_modules: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: Browser::Chromium,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            wait_timeout_ms: 15_000,
            node_modules: PathBuf::from("node_modules"),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from a TOML file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(E2eError::InvalidConfig(format!(
                    "base_url must start with http:// or https://, got '{}'",
                    url
                )));
            }
        }
        if self.port == 0 && self.base_url.is_none() {
            return Err(E2eError::InvalidConfig("port must be non-zero".to_string()));
        }
        self.retry_policy().map(|_| ())
    }

    /// Apply a command-line or environment target. A full URL wins; a bare
    /// port replaces any `base_url` from the file so the port takes effect.
    pub fn override_target(&mut self, port: Option<u16>, url: Option<String>) {
        if let Some(port) = port {
            self.port = port;
            self.base_url = None;
        }
        if let Some(url) = url {
            self.base_url = Some(url);
        }
    }

    /// The base address scenarios connect to.
    pub fn target_address(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn retry_policy(&self) -> E2eResult<RetryPolicy> {
        RetryPolicy::new(
            self.connect.max_attempts,
            Duration::from_millis(self.connect.delay_ms),
        )
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.browser.wait_timeout_ms)
    }

    /// Playwright launch settings derived from the browser section.
    pub fn playwright(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser.kind,
            headless: self.browser.headless,
            viewport_width: self.browser.viewport_width,
            viewport_height: self.browser.viewport_height,
            node_modules: self.browser.node_modules.clone(),
            ..PlaywrightConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_port_9999() {
        let config = SuiteConfig::default();
        assert_eq!(config.target_address(), "http://localhost:9999");
        assert_eq!(config.retry_policy().unwrap(), RetryPolicy::default());
        assert_eq!(config.wait_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn base_url_wins_over_port() {
        let config = SuiteConfig {
            base_url: Some("http://app.test:7777/".to_string()),
            port: 1234,
            ..Default::default()
        };
        assert_eq!(config.target_address(), "http://app.test:7777");
    }

    #[test]
    fn parses_partial_toml() {
        let config = SuiteConfig::from_toml(
            r#"
port = 8080

[connect]
max_attempts = 3
delay_ms = 500

[browser]
kind = "firefox"
headless = false
"#,
        )
        .unwrap();

        assert_eq!(config.target_address(), "http://localhost:8080");
        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_millis(500));
        assert_eq!(config.browser.kind, Browser::Firefox);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport_width, 1920);
    }

    #[test]
    fn port_override_replaces_base_url_from_file() {
        let mut config = SuiteConfig::from_toml("base_url = \"http://staging.test:8000\"\n").unwrap();
        config.override_target(Some(7777), None);
        assert_eq!(config.target_address(), "http://localhost:7777");
    }

    #[test]
    fn url_override_wins_over_port_override() {
        let mut config = SuiteConfig::default();
        config.override_target(Some(7777), Some("http://app.test:8080".to_string()));
        assert_eq!(config.target_address(), "http://app.test:8080");
    }

    #[test]
    fn no_override_keeps_file_target() {
        let mut config = SuiteConfig::from_toml("base_url = \"http://staging.test:8000\"\n").unwrap();
        config.override_target(None, None);
        assert_eq!(config.target_address(), "http://staging.test:8000");
    }

    #[test]
    fn rejects_zero_attempt_budget() {
        let err = SuiteConfig::from_toml("[connect]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, E2eError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = SuiteConfig::from_toml("base_url = \"localhost:9999\"\n").unwrap_err();
        assert!(matches!(err, E2eError::InvalidConfig(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SuiteConfig::load(&dir.path().join("suite.toml")).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }
}

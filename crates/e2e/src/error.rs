//! Error types for the card order suite

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// A single session attempt failed. Transient: the connector retries it.
    #[error("Connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    /// Every attempt in the budget failed. Terminal for the scenario.
    #[error("Failed to connect to {address} after {attempts} attempts")]
    ConnectionExhausted { address: String, attempts: u32 },

    /// The opener failed with an error retrying cannot fix.
    #[error("Connection to {address} aborted after {attempts} attempt(s): {source}")]
    ConnectionAborted {
        address: String,
        attempts: u32,
        #[source]
        source: Box<E2eError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Bridge protocol error: {0}")]
    Protocol(String),

    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout after {} ms waiting for: {what}", duration.as_millis())]
    Timeout { what: String, duration: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl E2eError {
    pub fn connection(address: impl Into<String>, reason: impl ToString) -> Self {
        E2eError::Connection {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the connector may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, E2eError::Connection { .. })
    }

    /// Connection attempts spent, for errors returned by the connector.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            E2eError::ConnectionExhausted { attempts, .. }
            | E2eError::ConnectionAborted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

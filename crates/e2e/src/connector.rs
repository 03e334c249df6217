//! Resilient connector - opening a session against a server that may still be starting
//!
//! Linear retry with a fixed pause between attempts:
//!
//! ```text
//! Idle -> Attempting -> Connected                    (session opened)
//!                    -> Attempting                   (failed, attempts < max)
//!                    -> Exhausted                    (failed, attempts == max)
//! ```
//!
//! No pause follows the last failed attempt; the exhaustion error is returned
//! right away.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::session::SessionOpener;

/// Attempt budget and backoff delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    pub fn new(max_attempts: u32, delay: Duration) -> E2eResult<Self> {
        if max_attempts == 0 {
            return Err(E2eError::InvalidConfig(
                "connection attempt budget must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_attempts, delay })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            delay: Self::DEFAULT_DELAY,
        }
    }
}

/// Outcome of a single connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt index
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

/// An opened session together with how it was obtained
#[derive(Debug)]
pub struct Connection<S> {
    pub session: S,
    pub attempts: u32,
    pub history: Vec<AttemptRecord>,
}

impl<S> Connection<S> {
    pub fn failures(&self) -> usize {
        self.history
            .iter()
            .filter(|r| matches!(r.outcome, AttemptOutcome::Failure(_)))
            .count()
    }
}

/// Opens sessions against one target address under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct ResilientConnector {
    address: String,
    policy: RetryPolicy,
}

impl ResilientConnector {
    pub fn new(address: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            address: address.into(),
            policy,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Open a session, retrying transient failures.
    pub async fn connect<O: SessionOpener>(&self, opener: &mut O) -> E2eResult<O::Session> {
        self.connect_with_history(opener)
            .await
            .map(|connection| connection.session)
    }

    /// Open a session and report every attempt made along the way.
    ///
    /// A non-transient error from the opener (Playwright missing, bad launch
    /// options) stops the loop at once and comes back as
    /// [`E2eError::ConnectionAborted`] carrying the attempts made so far.
    pub async fn connect_with_history<O: SessionOpener>(
        &self,
        opener: &mut O,
    ) -> E2eResult<Connection<O::Session>> {
        let max_attempts = self.policy.max_attempts;
        let mut history = Vec::new();

        for attempt in 1..=max_attempts {
            match opener.open_session(&self.address).await {
                Ok(session) => {
                    info!(address = %self.address, attempt, "Successfully connected");
                    history.push(AttemptRecord {
                        attempt,
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok(Connection {
                        session,
                        attempts: attempt,
                        history,
                    });
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        address = %self.address,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Connection attempt failed, retrying..."
                    );
                    history.push(AttemptRecord {
                        attempt,
                        outcome: AttemptOutcome::Failure(e.to_string()),
                    });
                    if attempt < max_attempts {
                        sleep(self.policy.delay).await;
                    }
                }
                Err(e) => {
                    error!(
                        address = %self.address,
                        attempt,
                        error = %e,
                        "Connection attempt failed with a non-retryable error"
                    );
                    return Err(E2eError::ConnectionAborted {
                        address: self.address.clone(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }

        error!(
            address = %self.address,
            attempts = max_attempts,
            "Connection attempts exhausted"
        );
        Err(E2eError::ConnectionExhausted {
            address: self.address.clone(),
            attempts: max_attempts,
        })
    }
}

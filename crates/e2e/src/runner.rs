//! Scenario runner: connects, executes steps, and always releases the session

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::SuiteConfig;
use crate::connector::ResilientConnector;
use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, SessionOpener};
use crate::spec::{ScenarioSpec, ScenarioStep};

/// Result of executing a single step
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    /// Connection attempts spent before the scenario could start
    pub attempts: u32,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Runs scenarios one at a time, each in its own session
pub struct ScenarioRunner<O: SessionOpener> {
    opener: O,
    connector: ResilientConnector,
    wait_timeout: Duration,
    specs_dir: PathBuf,
}

impl<O: SessionOpener> ScenarioRunner<O> {
    pub fn new(config: &SuiteConfig, opener: O) -> E2eResult<Self> {
        config.validate()?;
        let address = config.target_address();
        info!("Using URL: {}", address);

        Ok(Self {
            opener,
            connector: ResilientConnector::new(address, config.retry_policy()?),
            wait_timeout: config.wait_timeout(),
            specs_dir: config.specs_dir.clone(),
        })
    }

    pub fn connector(&self) -> &ResilientConnector {
        &self.connector
    }

    /// Run every scenario in the specs directory
    pub async fn run_all(&mut self) -> E2eResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.specs_dir)?;
        Ok(self.run_specs(&specs).await)
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<SuiteResult> {
        let specs: Vec<ScenarioSpec> = ScenarioSpec::load_all(&self.specs_dir)?
            .into_iter()
            .filter(|s| s.has_tag(tag))
            .collect();
        Ok(self.run_specs(&specs).await)
    }

    /// Run a specific scenario by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<SuiteResult> {
        let spec = ScenarioSpec::load_all(&self.specs_dir)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {}", name)))?;
        Ok(self.run_specs(std::slice::from_ref(&spec)).await)
    }

    /// Run a list of scenarios sequentially
    pub async fn run_specs(&mut self, specs: &[ScenarioSpec]) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            let result = self.run_scenario(spec).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run a single scenario. The session is closed on every exit path.
    pub async fn run_scenario(&mut self, spec: &ScenarioSpec) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let connection = match self.connector.connect_with_history(&mut self.opener).await {
            Ok(connection) => connection,
            Err(e) => {
                return ScenarioResult {
                    name: spec.name.clone(),
                    success: false,
                    attempts: e.attempts().unwrap_or(0),
                    duration_ms: start.elapsed().as_millis() as u64,
                    steps: vec![],
                    error: Some(e.to_string()),
                };
            }
        };

        let attempts = connection.attempts;
        let mut session = connection.session;

        let mut step_results = Vec::with_capacity(spec.steps.len());
        let mut scenario_error = None;

        for step in &spec.steps {
            let result = execute_step(&mut session, step, self.wait_timeout).await;
            let failed = !result.success;
            if failed {
                scenario_error = result.error.clone();
            }
            step_results.push(result);
            if failed {
                break;
            }
        }

        if let Err(e) = session.close().await {
            warn!("Failed to close session for '{}': {}", spec.name, e);
        }

        ScenarioResult {
            name: spec.name.clone(),
            success: scenario_error.is_none(),
            attempts,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
            error: scenario_error,
        }
    }
}

/// Execute a single step against a session
pub async fn execute_step<S: BrowserSession + ?Sized>(
    session: &mut S,
    step: &ScenarioStep,
    wait_timeout: Duration,
) -> StepResult {
    let start = Instant::now();
    let step_name = step.label();
    debug!("Executing step: {}", step_name);

    let outcome = apply_step(session, step, wait_timeout).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => StepResult {
            step_name,
            success: true,
            duration_ms,
            error: None,
        },
        Err(e) => StepResult {
            step_name,
            success: false,
            duration_ms,
            error: Some(e.to_string()),
        },
    }
}

async fn apply_step<S: BrowserSession + ?Sized>(
    session: &mut S,
    step: &ScenarioStep,
    wait_timeout: Duration,
) -> E2eResult<()> {
    match step {
        ScenarioStep::Fill { selector, value } => session.fill(selector, value).await,
        ScenarioStep::Click { selector } => session.click(selector).await,
        ScenarioStep::EnsureChecked { selector } => {
            if !session.is_checked(selector).await? {
                session.click(selector).await?;
            }
            Ok(())
        }
        ScenarioStep::AssertText {
            selector,
            text,
            timeout_ms,
        } => {
            let timeout = timeout_ms.map(Duration::from_millis).unwrap_or(wait_timeout);
            let actual = session.wait_visible(selector, timeout).await?;
            if actual.trim() != text.trim() {
                return Err(E2eError::AssertionFailed(format!(
                    "{}: expected '{}', got '{}'",
                    selector,
                    text.trim(),
                    actual.trim()
                )));
            }
            Ok(())
        }
        ScenarioStep::AssertVisible {
            selector,
            timeout_ms,
        } => {
            let timeout = timeout_ms.map(Duration::from_millis).unwrap_or(wait_timeout);
            session.wait_visible(selector, timeout).await.map(|_| ())
        }
        ScenarioStep::Log { message } => {
            info!("[SCENARIO LOG] {}", message);
            Ok(())
        }
    }
}

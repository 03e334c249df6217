//! Card Order E2E Suite
//!
//! Drives a browser against the externally hosted card order form and checks
//! what it renders for valid and invalid input:
//! - Opens a browser session through a retrying connector, so a server that
//!   is still starting does not fail the run
//! - Controls Playwright through a Node bridge speaking line-delimited JSON
//! - Describes scenarios as declarative YAML specs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Card Order E2E Suite (Rust)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── ResilientConnector::connect(opener) -> Session       │
//! │    │     └── RetryPolicy { max_attempts, delay }            │
//! │    ├── execute_step(session, step) -> StepResult            │
//! │    └── session.close()            (every exit path)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioSpec (YAML)                                        │
//! │    ├── name, description, tags                              │
//! │    └── steps: [Step]                                        │
//! │          ├── fill { selector, value }                       │
//! │          ├── click { selector }                             │
//! │          ├── ensure_checked { selector }                    │
//! │          ├── assert_text { selector, text, timeout_ms? }    │
//! │          ├── assert_visible { selector, timeout_ms? }       │
//! │          └── log { message }                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod playwright;
pub mod runner;
pub mod session;
pub mod spec;

pub use config::SuiteConfig;
pub use connector::{AttemptOutcome, Connection, ResilientConnector, RetryPolicy};
pub use error::{E2eError, E2eResult};
pub use runner::ScenarioRunner;
pub use session::{BrowserSession, SessionOpener};
pub use spec::{ScenarioSpec, ScenarioStep};

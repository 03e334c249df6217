//! E2E harness entry point
//!
//! Runs the YAML card order scenarios against a running application.
//! Run with: cargo test --package card-order-e2e --test e2e -- --port 9999

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use card_order_e2e::playwright::{Browser, PlaywrightLauncher};
use card_order_e2e::{E2eError, E2eResult, ScenarioRunner, SuiteConfig};

#[derive(Parser, Debug)]
#[command(name = "card-order-e2e")]
#[command(about = "E2E suite for the card order form")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long, default_value = "e2e.toml")]
    config: PathBuf,

    /// Path to scenario specs directory
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Port of the application under test on localhost
    #[arg(long, env = "APP_PORT")]
    port: Option<u16>,

    /// Full base address of the application; overrides --port
    #[arg(long, env = "APP_URL")]
    url: Option<String>,

    /// Browser to use
    #[arg(long, value_enum)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Connection attempt budget
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Pause between connection attempts, in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Explicit-wait budget for visibility checks, in milliseconds
    #[arg(long)]
    wait_timeout_ms: Option<u64>,

    /// Fail instead of skipping when Playwright is not installed
    #[arg(long, env = "E2E_REQUIRE_BROWSER")]
    require_browser: bool,

    // Absorbs flags cargo's test runner forwards (e.g. --nocapture)
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    _passthrough: Vec<String>,
}

impl Args {
    fn into_config(self) -> E2eResult<(SuiteConfig, Option<String>, Option<String>)> {
        let mut config = SuiteConfig::load(&self.config)?;

        if let Some(specs) = self.specs {
            config.specs_dir = specs;
        } else if !config.specs_dir.is_dir() {
            // cargo runs test binaries from the package directory
            config.specs_dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/specs"));
        }
        config.override_target(self.port, self.url);
        if let Some(browser) = self.browser {
            config.browser.kind = browser;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.connect.max_attempts = max_attempts;
        }
        if let Some(delay_ms) = self.retry_delay_ms {
            config.connect.delay_ms = delay_ms;
        }
        if let Some(wait_timeout_ms) = self.wait_timeout_ms {
            config.browser.wait_timeout_ms = wait_timeout_ms;
        }

        config.validate()?;
        Ok((config, self.tag, self.name))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let require_browser = args.require_browser;

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(E2eError::PlaywrightNotFound) if !require_browser => {
            warn!("Playwright is not installed, skipping the browser suite");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let (config, tag, name) = args.into_config()?;

    let launcher = PlaywrightLauncher::new(config.playwright())?;
    let mut runner = ScenarioRunner::new(&config, launcher)?;
    info!(
        "Connecting with up to {} attempt(s), {:?} apart",
        runner.connector().policy().max_attempts(),
        runner.connector().policy().delay()
    );

    let results = if let Some(name) = name {
        runner.run_named(&name).await?
    } else if let Some(tag) = tag {
        runner.run_tagged(&tag).await?
    } else {
        runner.run_all().await?
    };

    Ok(results.all_passed())
}

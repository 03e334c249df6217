//! Playwright browser automation
//!
//! Each session runs a small Node bridge hosting one Playwright page. Rust
//! talks to it over stdin/stdout, one JSON object per line:
//!
//! ```text
//! -> {"id":3,"cmd":"wait_visible","selector":"[data-test-id=order-success]","timeout_ms":15000}
//! <- {"id":3,"ok":true,"value":"..."}
//! ```
//!
//! The bridge announces readiness with reply id 0 once the browser is up.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, SessionOpener};

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const launch = JSON.parse(process.argv[2]);
let browser;
let page;

function reply(msg) {
  process.stdout.write(JSON.stringify(msg) + '\n');
}

async function handle(req) {
  switch (req.cmd) {
    case 'goto': {
      const response = await page.goto(req.url, { waitUntil: 'load' });
      if (response && !response.ok()) {
        throw new Error('HTTP ' + response.status() + ' from ' + req.url);
      }
      return null;
    }
    case 'fill':
      await page.locator(req.selector).first().pressSequentially(req.value);
      return null;
    case 'click':
      await page.locator(req.selector).first().click();
      return null;
    case 'is_checked':
      return await page.locator(req.selector).first().evaluate((el) => {
        const input = el.matches('input') ? el : el.querySelector('input[type=checkbox]');
        return !!(input && input.checked);
      });
    case 'wait_visible': {
      const locator = page.locator(req.selector).first();
      await locator.waitFor({ state: 'visible', timeout: req.timeout_ms });
      return (await locator.innerText()).trim();
    }
    case 'close':
      await browser.close();
      return null;
    default:
      throw new Error('unknown command: ' + req.cmd);
  }
}

(async () => {
  try {
    browser = await playwright[launch.browser].launch({ headless: launch.headless, args: launch.args });
    const context = await browser.newContext({ viewport: launch.viewport });
    page = await context.newPage();
    reply({ id: 0, ok: true });
  } catch (error) {
    reply({ id: 0, ok: false, error: error.message });
    process.exit(1);
  }

  const input = readline.createInterface({ input: process.stdin });
  for await (const line of input) {
    if (!line.trim()) continue;
    const req = JSON.parse(line);
    try {
      const value = await handle(req);
      reply({ id: req.id, ok: true, value });
      if (req.cmd === 'close') process.exit(0);
    } catch (error) {
      reply({ id: req.id, ok: false, error: error.message, timeout: error.name === 'TimeoutError' });
    }
  }
  await browser.close();
})();
"#;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Extra browser flags, only passed to Chromium
    pub chromium_args: Vec<String>,
    pub node_modules: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_args: vec![
                "--disable-dev-shm-usage".to_string(),
                "--no-sandbox".to_string(),
                "--remote-allow-origins=*".to_string(),
            ],
            node_modules: PathBuf::from("node_modules"),
        }
    }
}

impl PlaywrightConfig {
    fn launch_options(&self) -> Value {
        let args: &[String] = match self.browser {
            Browser::Chromium => &self.chromium_args,
            _ => &[],
        };
        serde_json::json!({
            "browser": self.browser.as_str(),
            "headless": self.headless,
            "viewport": { "width": self.viewport_width, "height": self.viewport_height },
            "args": args,
        })
    }
}

/// Opens one Playwright bridge per session
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    /// Create a launcher, failing fast if Playwright is not installed
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self { config })
    }

    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl SessionOpener for PlaywrightLauncher {
    type Session = PlaywrightSession;

    async fn open_session(&mut self, address: &str) -> E2eResult<PlaywrightSession> {
        let mut session = PlaywrightSession::launch(&self.config).await?;

        // Only navigation failures are transient; a browser that will not launch stays broken.
        if let Err(e) = session.goto(address).await {
            if let Err(close_err) = session.close().await {
                debug!("Closing bridge after failed navigation: {}", close_err);
            }
            return Err(E2eError::connection(address, e));
        }

        Ok(session)
    }
}

#[derive(Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeCommand<'a> {
    Goto { url: &'a str },
    Fill { selector: &'a str, value: &'a str },
    Click { selector: &'a str },
    IsChecked { selector: &'a str },
    WaitVisible { selector: &'a str, timeout_ms: u64 },
    Close,
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: BridgeCommand<'a>,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

impl BridgeReply {
    /// Only explicit waits become [`E2eError::Timeout`]; Playwright's own
    /// timeouts on other commands keep its message, which names the limit.
    fn into_result(self, what: &str, wait: Option<Duration>) -> E2eResult<Option<Value>> {
        if self.ok {
            return Ok(self.value);
        }

        let message = self
            .error
            .unwrap_or_else(|| "unknown bridge error".to_string());
        match wait {
            Some(duration) if self.timeout => {
                debug!("Bridge timeout: {}", message);
                Err(E2eError::Timeout {
                    what: what.to_string(),
                    duration,
                })
            }
            _ => Err(E2eError::Playwright(message)),
        }
    }
}

/// A browser page hosted by a Node bridge process
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
    _script_dir: TempDir,
}

impl PlaywrightSession {
    async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let node_path = std::env::current_dir()?.join(&config.node_modules);
        debug!(
            "Launching Playwright bridge: {} ({})",
            script_path.display(),
            config.browser.as_str()
        );

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(config.launch_options().to_string())
            .env("NODE_PATH", node_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Protocol("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Protocol("bridge stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            closed: false,
            _script_dir: script_dir,
        };

        session.read_reply(0, "launch", None).await?;
        info!("Browser launched ({})", config.browser.as_str());
        Ok(session)
    }

    async fn request(&mut self, command: BridgeCommand<'_>) -> E2eResult<Option<Value>> {
        if self.closed {
            return Err(E2eError::Protocol("session already closed".to_string()));
        }
        self.next_id += 1;
        let id = self.next_id;
        let what = match &command {
            BridgeCommand::Goto { url } => format!("goto {}", url),
            BridgeCommand::Fill { selector, .. }
            | BridgeCommand::Click { selector }
            | BridgeCommand::IsChecked { selector }
            | BridgeCommand::WaitVisible { selector, .. } => selector.to_string(),
            BridgeCommand::Close => "close".to_string(),
        };
        let wait = match &command {
            BridgeCommand::WaitVisible { timeout_ms, .. } => {
                Some(Duration::from_millis(*timeout_ms))
            }
            _ => None,
        };

        let mut line = serde_json::to_string(&BridgeRequest { id, command })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        self.read_reply(id, &what, wait).await
    }

    async fn read_reply(
        &mut self,
        id: u64,
        what: &str,
        wait: Option<Duration>,
    ) -> E2eResult<Option<Value>> {
        loop {
            let line = self.stdout.next_line().await?.ok_or_else(|| {
                E2eError::Playwright(format!("bridge exited while waiting for {}", what))
            })?;

            let reply: BridgeReply = match serde_json::from_str(&line) {
                Ok(reply) => reply,
                Err(_) => {
                    debug!("[bridge] {}", line);
                    continue;
                }
            };

            if reply.id != id {
                return Err(E2eError::Protocol(format!(
                    "expected reply {} but got {}",
                    id, reply.id
                )));
            }

            return reply.into_result(what, wait);
        }
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Goto { url }).await.map(|_| ())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Fill { selector, value })
            .await
            .map(|_| ())
    }

    async fn click(&mut self, selector: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Click { selector }).await.map(|_| ())
    }

    async fn is_checked(&mut self, selector: &str) -> E2eResult<bool> {
        let value = self.request(BridgeCommand::IsChecked { selector }).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> E2eResult<String> {
        let timeout_ms = timeout.as_millis() as u64;
        let value = self
            .request(BridgeCommand::WaitVisible {
                selector,
                timeout_ms,
            })
            .await?;
        Ok(value
            .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
            .unwrap_or_default())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }

        let graceful = tokio::time::timeout(CLOSE_TIMEOUT, self.request(BridgeCommand::Close)).await;
        self.closed = true;

        match graceful {
            Ok(Ok(_)) => {
                if tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await.is_err() {
                    warn!("Bridge did not exit after close, killing it");
                    self.child.kill().await?;
                }
            }
            Ok(Err(e)) => {
                warn!("Graceful browser close failed: {}", e);
                self.child.kill().await?;
            }
            Err(_) => {
                warn!("Browser close timed out, killing bridge");
                self.child.kill().await?;
            }
        }

        debug!("Browser session closed");
        Ok(())
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.start_kill();
        }
    }
}

//! Browser session seam
//!
//! The connector and the runner only see these traits. The Playwright bridge
//! in [`crate::playwright`] is the production implementation; tests plug in
//! scripted sessions.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::E2eResult;

/// A live page in a browser, owned by exactly one scenario.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the page to an absolute URL.
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    /// Type `value` into the first element matching `selector`.
    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()>;

    async fn click(&mut self, selector: &str) -> E2eResult<()>;

    /// Whether the checkbox at `selector` (or the checkbox nested inside it) is checked.
    async fn is_checked(&mut self, selector: &str) -> E2eResult<bool>;

    /// Wait until `selector` is visible and return its trimmed text.
    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> E2eResult<String>;

    /// Release the browser. Calling it twice is a no-op.
    async fn close(&mut self) -> E2eResult<()>;
}

/// Capability to open a session against a target address.
///
/// A failure that may clear up on its own (server still starting) must be
/// reported as [`crate::E2eError::Connection`] so the connector retries it.
#[async_trait]
pub trait SessionOpener: Send {
    type Session: BrowserSession;

    async fn open_session(&mut self, address: &str) -> E2eResult<Self::Session>;
}

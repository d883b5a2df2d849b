// Trait seams for the scrape pipeline.
//
// SessionProvider hides the remote session lifecycle API (Steel).
// BrowserConnector / BrowserPage / PageElement hide the CDP transport.
//
// Every DOM lookup returns an Option or an empty Vec instead of failing on
// "not found", so fallback chains are plain iteration. Err is reserved for
// transport failures and timeouts.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A provisioned remote browser. Owned by exactly one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSession {
    pub id: String,
    pub remote_endpoint: String,
}

impl From<steel_client::SessionInfo> for BrowserSession {
    fn from(info: steel_client::SessionInfo) -> Self {
        Self {
            id: info.id,
            remote_endpoint: info.websocket_url,
        }
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Provision a new remote browser session.
    async fn create_session(&self) -> Result<BrowserSession>;

    /// Tear a session down. Callers treat failure as non-fatal.
    async fn release_session(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
impl SessionProvider for steel_client::SteelClient {
    async fn create_session(&self) -> Result<BrowserSession> {
        Ok(self.create_session().await?.into())
    }

    async fn release_session(&self, session_id: &str) -> Result<()> {
        Ok(self.release_session(session_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Browser transport
// ---------------------------------------------------------------------------

/// How to find something clickable on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS selector.
    Css(String),
    /// A `<button>` whose trimmed visible text contains this string.
    ButtonText(String),
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn button_text(text: &str) -> Self {
        Locator::ButtonText(text.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(sel) => write!(f, "{sel}"),
            Locator::ButtonText(text) => write!(f, "button:has-text({text:?})"),
        }
    }
}

#[async_trait]
pub trait BrowserConnector: Send + Sync {
    /// Attach to the session's browser. Reuses an existing page when the
    /// session already has one, otherwise opens a blank page.
    async fn connect(&self, session: &BrowserSession) -> Result<Box<dyn BrowserPage>>;
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the document to load, bounded by `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Document title, if the page has one.
    async fn title(&self) -> Result<Option<String>>;

    /// First element matching `selector`.
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>>;

    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>>;

    /// Click the first element matching `locator`. Errors if nothing matched in time.
    async fn click(&self, locator: &Locator, timeout: Duration) -> Result<()>;

    /// Wait until `selector` matches something.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Wait until the document has finished loading and network activity settled.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    /// Disconnect from the browser.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait PageElement: Send + Sync {
    /// Rendered text of the element.
    async fn inner_text(&self) -> Result<Option<String>>;

    /// Resolved `href` of the nearest enclosing `<a>` (including the element itself).
    async fn closest_link_href(&self) -> Result<Option<String>>;

    /// Descendants matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;
}

// Test mocks for the scrape pipeline.
//
// Mocks matching the trait boundaries:
// - MockSessionProvider (SessionProvider): counts creates/releases, can fail either
// - MockBrowser (BrowserConnector): URL→MockSite map behind one shared tab
// - MockPage / MockElement (BrowserPage / PageElement): selector→elements DOM stand-in
// - RecordingObserver (ScrapeObserver): captures events in order

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::observer::{ScrapeEvent, ScrapeObserver};
use crate::traits::{BrowserConnector, BrowserPage, BrowserSession, Locator, PageElement, SessionProvider};

// ---------------------------------------------------------------------------
// MockElement
// ---------------------------------------------------------------------------

/// A DOM node stand-in. Child lookups are keyed by the exact selector string.
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    text: String,
    broken: bool,
    link: Option<String>,
    attrs: HashMap<String, String>,
    children: HashMap<String, Vec<MockElement>>,
}

impl MockElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// A node whose text and link reads fail, like a detached handle.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Default::default()
        }
    }

    /// Nest the node inside an `<a href=...>`.
    pub fn linked_to(mut self, href: &str) -> Self {
        self.link = Some(href.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_children(mut self, selector: &str, children: Vec<MockElement>) -> Self {
        self.children.insert(selector.to_string(), children);
        self
    }
}

fn boxed(elements: &[MockElement]) -> Vec<Box<dyn PageElement>> {
    elements
        .iter()
        .cloned()
        .map(|e| Box::new(e) as Box<dyn PageElement>)
        .collect()
}

#[async_trait]
impl PageElement for MockElement {
    async fn inner_text(&self) -> Result<Option<String>> {
        if self.broken {
            bail!("MockElement: node is detached");
        }
        Ok(Some(self.text.clone()))
    }

    async fn closest_link_href(&self) -> Result<Option<String>> {
        if self.broken {
            bail!("MockElement: node is detached");
        }
        Ok(self.link.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>> {
        Ok(self.children.get(selector).map(|c| boxed(c)).unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attrs.get(name).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

/// A single loaded document. Builder pattern: `.with_elements()`, `.clickable()`,
/// `.ready_on()`, `.never_idle()`.
#[derive(Debug, Clone)]
pub struct MockPage {
    title: Option<String>,
    elements: HashMap<String, Vec<MockElement>>,
    clickable: HashSet<Locator>,
    ready_selectors: HashSet<String>,
    network_idle: bool,
}

impl MockPage {
    pub fn new(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::untitled()
        }
    }

    pub fn untitled() -> Self {
        Self {
            title: None,
            elements: HashMap::new(),
            clickable: HashSet::new(),
            ready_selectors: HashSet::new(),
            network_idle: true,
        }
    }

    pub fn with_elements(mut self, selector: &str, elements: Vec<MockElement>) -> Self {
        self.elements.insert(selector.to_string(), elements);
        self
    }

    pub fn clickable(mut self, locator: Locator) -> Self {
        self.clickable.insert(locator);
        self
    }

    /// Make `wait_for_selector(selector)` succeed even without registered elements.
    pub fn ready_on(mut self, selector: &str) -> Self {
        self.ready_selectors.insert(selector.to_string());
        self
    }

    /// Make the network-idle readiness signal time out.
    pub fn never_idle(mut self) -> Self {
        self.network_idle = false;
        self
    }

    fn has_selector(&self, selector: &str) -> bool {
        self.ready_selectors.contains(selector)
            || self.elements.get(selector).is_some_and(|e| !e.is_empty())
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn title(&self) -> Result<Option<String>> {
        Ok(self.title.clone())
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>> {
        Ok(self
            .elements
            .get(selector)
            .and_then(|els| els.first())
            .cloned()
            .map(|e| Box::new(e) as Box<dyn PageElement>))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>> {
        Ok(self.elements.get(selector).map(|e| boxed(e)).unwrap_or_default())
    }

    async fn click(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        if self.clickable.contains(locator) {
            Ok(())
        } else {
            bail!("MockPage: nothing matches {locator} within {timeout:?}")
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.has_selector(selector) {
            Ok(())
        } else {
            bail!("MockPage: timed out after {timeout:?} waiting for {selector}")
        }
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        if self.network_idle {
            Ok(())
        } else {
            bail!("MockPage: network never idle within {timeout:?}")
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum MockSite {
    Page(MockPage),
    Unreachable(String),
    TimesOut,
    /// Navigation never completes; for cancellation tests.
    Hangs,
}

/// What happened inside the browser during a run.
#[derive(Debug, Default, Clone)]
pub struct BrowserLog {
    pub connects: Vec<String>,
    pub navigations: Vec<String>,
    pub clicks: Vec<Locator>,
    pub closes: usize,
}

/// HashMap-based browser. Navigating to an unregistered URL fails like DNS
/// failure. Builder pattern: `.on_page()`, `.unreachable()`, `.times_out()`, `.hangs()`.
pub struct MockBrowser {
    sites: Arc<HashMap<String, MockSite>>,
    log: Arc<Mutex<BrowserLog>>,
    fail_connect: bool,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            sites: Arc::new(HashMap::new()),
            log: Arc::new(Mutex::new(BrowserLog::default())),
            fail_connect: false,
        }
    }

    fn with_site(mut self, url: &str, site: MockSite) -> Self {
        Arc::make_mut(&mut self.sites).insert(url.to_string(), site);
        self
    }

    pub fn on_page(self, url: &str, page: MockPage) -> Self {
        self.with_site(url, MockSite::Page(page))
    }

    pub fn unreachable(self, url: &str, error: &str) -> Self {
        self.with_site(url, MockSite::Unreachable(error.to_string()))
    }

    pub fn times_out(self, url: &str) -> Self {
        self.with_site(url, MockSite::TimesOut)
    }

    pub fn hangs(self, url: &str) -> Self {
        self.with_site(url, MockSite::Hangs)
    }

    pub fn refuse_connections(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn log(&self) -> BrowserLog {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BrowserConnector for MockBrowser {
    async fn connect(&self, session: &BrowserSession) -> Result<Box<dyn BrowserPage>> {
        if self.fail_connect {
            bail!("MockBrowser: connection refused at {}", session.remote_endpoint);
        }
        if let Ok(mut log) = self.log.lock() {
            log.connects.push(session.remote_endpoint.clone());
        }
        Ok(Box::new(MockTab {
            sites: self.sites.clone(),
            log: self.log.clone(),
            current: Mutex::new(None),
        }))
    }
}

/// The single browsing context a run drives.
struct MockTab {
    sites: Arc<HashMap<String, MockSite>>,
    log: Arc<Mutex<BrowserLog>>,
    current: Mutex<Option<MockPage>>,
}

impl MockTab {
    fn current(&self) -> Option<MockPage> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl BrowserPage for MockTab {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.navigations.push(url.to_string());
        }
        let page = match self.sites.get(url) {
            Some(MockSite::Page(page)) => page.clone(),
            Some(MockSite::Unreachable(error)) => return Err(anyhow!("{error} at {url}")),
            Some(MockSite::TimesOut) => bail!("navigation to {url} timed out after {timeout:?}"),
            Some(MockSite::Hangs) => std::future::pending().await,
            None => bail!("net::ERR_NAME_NOT_RESOLVED at {url}"),
        };
        if let Ok(mut current) = self.current.lock() {
            *current = Some(page);
        }
        Ok(())
    }

    async fn title(&self) -> Result<Option<String>> {
        match self.current() {
            Some(page) => page.title().await,
            None => Ok(None),
        }
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>> {
        match self.current() {
            Some(page) => page.query(selector).await,
            None => Ok(None),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>> {
        match self.current() {
            Some(page) => page.query_all(selector).await,
            None => Ok(Vec::new()),
        }
    }

    async fn click(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let page = self.current().ok_or_else(|| anyhow!("MockTab: no document loaded"))?;
        page.click(locator, timeout).await?;
        if let Ok(mut log) = self.log.lock() {
            log.clicks.push(locator.clone());
        }
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.current().ok_or_else(|| anyhow!("MockTab: no document loaded"))?;
        page.wait_for_selector(selector, timeout).await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let page = self.current().ok_or_else(|| anyhow!("MockTab: no document loaded"))?;
        page.wait_for_network_idle(timeout).await
    }

    async fn close(&self) -> Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.closes += 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockSessionProvider
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSessionProvider {
    fail_create: bool,
    fail_release: bool,
    release_delay: Duration,
    created: Mutex<Vec<String>>,
    released: Mutex<Vec<String>>,
}

impl MockSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub fn failing_release() -> Self {
        Self {
            fail_release: true,
            ..Self::default()
        }
    }

    /// Make each release take `delay` before it reaches the provider.
    pub fn with_release_delay(mut self, delay: Duration) -> Self {
        self.release_delay = delay;
        self
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Every release call that reached the provider, successful or not.
    pub fn released(&self) -> Vec<String> {
        self.released.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn create_session(&self) -> Result<BrowserSession> {
        if self.fail_create {
            bail!("MockSessionProvider: provider returned 503");
        }
        let mut created = self
            .created
            .lock()
            .map_err(|_| anyhow!("MockSessionProvider: lock poisoned"))?;
        let id = format!("session-{}", created.len() + 1);
        created.push(id.clone());
        Ok(BrowserSession {
            remote_endpoint: format!("ws://mock.browser/devtools/{id}"),
            id,
        })
    }

    async fn release_session(&self, session_id: &str) -> Result<()> {
        if !self.release_delay.is_zero() {
            tokio::time::sleep(self.release_delay).await;
        }
        if let Ok(mut released) = self.released.lock() {
            released.push(session_id.to_string());
        }
        if self.fail_release {
            bail!("MockSessionProvider: release endpoint unavailable");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingObserver
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ScrapeEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScrapeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ScrapeObserver for RecordingObserver {
    fn on_event(&self, event: &ScrapeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

/// A results page with `#search` ready and one `h3`-in-link per `(title, url)`.
pub fn results_page(links: &[(&str, &str)]) -> MockPage {
    let headings = links
        .iter()
        .map(|(title, url)| MockElement::text(title).linked_to(url))
        .collect();
    MockPage::new("Search results")
        .ready_on("#search")
        .with_elements("h3", headings)
}

/// An article page with a heading, two real paragraphs and a description.
pub fn article_page(title: &str) -> MockPage {
    let article = MockElement::text(&format!("{title}\nFull article text about {title}."))
        .with_children(
            crate::content::HEADING_SELECTOR,
            vec![MockElement::text(title)],
        )
        .with_children(
            crate::content::PARAGRAPH_SELECTOR,
            vec![
                MockElement::text(&format!("The opening paragraph of the {title} story.")),
                MockElement::text(&format!("A second, longer paragraph that expands on {title}.")),
            ],
        );
    MockPage::new(title)
        .with_elements("article", vec![article])
        .with_elements(
            crate::content::DESCRIPTION_SELECTOR,
            vec![MockElement::text("").with_attr("content", &format!("About {title}"))],
        )
}

// chromiumoxide-backed browser transport.
//
// Connects to the session's CDP websocket, drives one page, and exposes DOM
// reads through the BrowserPage / PageElement traits. The CDP handler must be
// polled for the connection to make progress, so it runs on its own task for
// the lifetime of the page.
//
// The remote browser belongs to the session provider. This side only ever
// disconnects; tearing the browser down is left to the session release.

use std::fmt::Display;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::traits::{BrowserConnector, BrowserPage, BrowserSession, Locator, PageElement};

/// Interval between readiness probes.
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Quiet period after the last finished resource before the network counts as idle.
const NETWORK_QUIET_MS: u64 = 500;
/// Time for the handler to register targets that existed before we connected.
const TARGET_DISCOVERY_WAIT: Duration = Duration::from_millis(200);

const CLOSEST_LINK_JS: &str =
    "function() { const a = this.closest('a'); return a ? a.href : null; }";
/// DOMContentLoaded has fired once the document leaves the `loading` state.
const DOM_READY_JS: &str = "document.readyState !== 'loading'";

#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumConnector;

#[async_trait]
impl BrowserConnector for ChromiumConnector {
    async fn connect(&self, session: &BrowserSession) -> Result<Box<dyn BrowserPage>> {
        info!(endpoint = %session.remote_endpoint, "Connecting to browser via CDP");
        let (mut browser, mut handler) = Browser::connect(session.remote_endpoint.clone())
            .await
            .with_context(|| format!("CDP connect to {}", session.remote_endpoint))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = match attach_page(&mut browser).await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(e);
            }
        };

        Ok(Box::new(ChromiumPage {
            page,
            connection: CdpConnection::new(browser, handler_task),
        }))
    }
}

/// Reuse the session's existing tab when there is one, otherwise open a blank page.
async fn attach_page(browser: &mut Browser) -> Result<Page> {
    // Only targets created after connecting are tracked until we ask for the rest.
    if let Err(e) = browser.fetch_targets().await {
        warn!(error = %e, "Could not list existing browser targets");
    }
    tokio::time::sleep(TARGET_DISCOVERY_WAIT).await;

    match first_existing(browser.pages().await) {
        Some(page) => {
            info!("Using existing browser page");
            Ok(page)
        }
        None => {
            info!("Opening new browser page");
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| anyhow!(e).context("Failed to open a page"))
        }
    }
}

fn first_existing<T, E: Display>(listed: std::result::Result<Vec<T>, E>) -> Option<T> {
    match listed {
        Ok(pages) => pages.into_iter().next(),
        Err(e) => {
            warn!(error = %e, "Could not read existing browser pages");
            None
        }
    }
}

/// The browser handle plus the task polling its CDP handler.
struct CdpConnection<B> {
    browser: Mutex<Option<B>>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

impl<B> CdpConnection<B> {
    fn new(browser: B, handler: JoinHandle<()>) -> Self {
        Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler)),
        }
    }

    /// Drop the browser handle and stop the handler, closing the websocket.
    /// Never sends `Browser.close`. Returns false if already disconnected.
    fn disconnect(&self) -> bool {
        let browser = self.browser.lock().ok().and_then(|mut b| b.take());
        let handler = self.handler.lock().ok().and_then(|mut h| h.take());
        if let Some(task) = &handler {
            task.abort();
        }
        let was_connected = browser.is_some() || handler.is_some();
        drop(browser);
        was_connected
    }
}

impl<B> Drop for CdpConnection<B> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

pub struct ChromiumPage {
    page: Page,
    connection: CdpConnection<Browser>,
}

impl ChromiumPage {
    async fn evaluate_bool(&self, js: &str) -> Result<bool> {
        let value = self.page.evaluate(js).await?;
        Ok(value.into_value::<bool>()?)
    }

    async fn click_css(&self, selector: &str) -> Result<bool> {
        let found = self.page.find_elements(selector).await?;
        match found.first() {
            Some(el) => {
                el.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Repeat `probe` until it reports true or `timeout` elapses. Probe errors
/// count as "not yet": the page may be mid-navigation.
async fn poll_until<F, Fut>(what: &str, timeout: Duration, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let waited = tokio::time::timeout(timeout, async {
        loop {
            match probe().await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => debug!(what, error = %e, "Probe failed, retrying"),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;

    if waited.is_err() {
        bail!("timed out after {timeout:?} waiting for {what}");
    }
    Ok(())
}

/// `Page.navigate` reports network-level failures in `errorText` rather than as a CDP error.
fn navigation_outcome(url: &str, error_text: Option<&str>) -> Result<()> {
    match error_text.map(str::trim) {
        Some(err) if !err.is_empty() => bail!("navigation to {url} failed: {err}"),
        _ => Ok(()),
    }
}

fn button_text_js(text: &str) -> Result<String> {
    let needle = serde_json::to_string(text)?;
    Ok(format!(
        r#"(() => {{
            const want = {needle};
            for (const b of document.querySelectorAll('button')) {{
                if ((b.innerText || '').trim().includes(want)) {{ b.click(); return true; }}
            }}
            return false;
        }})()"#
    ))
}

fn network_idle_js() -> String {
    format!(
        r#"(() => {{
            if (document.readyState !== 'complete') return false;
            const entries = performance.getEntriesByType('resource');
            const last = entries.reduce((m, e) => Math.max(m, e.responseEnd), 0);
            return performance.now() - last > {NETWORK_QUIET_MS};
        }})()"#
    )
}

fn boxed(elements: Vec<Element>) -> Vec<Box<dyn PageElement>> {
    elements
        .into_iter()
        .map(|el| Box::new(ChromiumElement { el }) as Box<dyn PageElement>)
        .collect()
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    /// Returns once DOMContentLoaded fired; subresources may still be loading.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let started = tokio::time::Instant::now();

        let sent = match tokio::time::timeout(timeout, self.page.execute(NavigateParams::new(url))).await {
            Ok(Ok(sent)) => sent,
            Ok(Err(e)) => return Err(anyhow!(e).context(format!("navigation to {url} failed"))),
            Err(_) => bail!("navigation to {url} timed out after {timeout:?}"),
        };
        navigation_outcome(url, sent.result.error_text.as_deref())?;

        let remaining = timeout.saturating_sub(started.elapsed());
        poll_until("DOMContentLoaded", remaining, || self.evaluate_bool(DOM_READY_JS))
            .await
            .with_context(|| format!("navigation to {url} timed out"))
    }

    async fn title(&self) -> Result<Option<String>> {
        Ok(self.page.get_title().await?)
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>> {
        let found = self.page.find_elements(selector).await?;
        Ok(boxed(found).into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>> {
        Ok(boxed(self.page.find_elements(selector).await?))
    }

    async fn click(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let what = locator.to_string();
        match locator {
            Locator::Css(selector) => {
                poll_until(&what, timeout, || self.click_css(selector)).await
            }
            Locator::ButtonText(text) => {
                let js = button_text_js(text)?;
                poll_until(&what, timeout, || self.evaluate_bool(&js)).await
            }
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        poll_until(selector, timeout, || async {
            Ok::<bool, anyhow::Error>(!self.page.find_elements(selector).await?.is_empty())
        })
        .await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let js = network_idle_js();
        poll_until("network idle", timeout, || self.evaluate_bool(&js)).await
    }

    async fn close(&self) -> Result<()> {
        if self.connection.disconnect() {
            info!("Disconnected from browser");
        }
        Ok(())
    }
}

pub struct ChromiumElement {
    el: Element,
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn inner_text(&self) -> Result<Option<String>> {
        Ok(self.el.inner_text().await?)
    }

    async fn closest_link_href(&self) -> Result<Option<String>> {
        let ret = self.el.call_js_fn(CLOSEST_LINK_JS, false).await?;
        if let Some(details) = ret.exception_details {
            bail!("closest link lookup threw: {}", details.text);
        }
        Ok(ret
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>> {
        Ok(boxed(self.el.find_elements(selector).await?))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.el.attribute(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn button_text_script_escapes_the_needle() {
        let js = button_text_js(r#"Accept "all""#).unwrap();
        assert!(js.contains(r#"const want = "Accept \"all\"";"#));
    }

    #[tokio::test]
    async fn poll_until_returns_once_probe_succeeds() {
        let mut calls = 0;
        poll_until("third probe", Duration::from_secs(5), || {
            calls += 1;
            let done = calls >= 3;
            async move { Ok::<bool, anyhow::Error>(done) }
        })
        .await
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn poll_until_times_out_on_persistent_errors() {
        let err = poll_until("never", Duration::from_millis(300), || async {
            Err::<bool, _>(anyhow!("detached"))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn existing_page_is_preferred() {
        let listed: std::result::Result<Vec<&str>, String> = Ok(vec!["session-tab", "popup"]);
        assert_eq!(first_existing(listed), Some("session-tab"));
    }

    #[test]
    fn unreadable_page_list_falls_back_to_a_new_page() {
        let empty: std::result::Result<Vec<&str>, String> = Ok(Vec::new());
        assert_eq!(first_existing(empty), None);
        let failed: std::result::Result<Vec<&str>, String> = Err("target lookup failed".into());
        assert_eq!(first_existing(failed), None);
    }

    #[test]
    fn navigation_error_text_fails_the_navigation() {
        let err = navigation_outcome("https://gone.example/", Some("net::ERR_NAME_NOT_RESOLVED"))
            .unwrap_err();
        assert!(err.to_string().contains("net::ERR_NAME_NOT_RESOLVED"));
        assert!(navigation_outcome("https://ok.example/", None).is_ok());
        assert!(navigation_outcome("https://ok.example/", Some("")).is_ok());
    }

    #[tokio::test]
    async fn disconnect_releases_the_handle_without_closing_anything_else() {
        let browser = Arc::new("remote browser");
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let handler = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await
        });

        let connection = CdpConnection::new(browser.clone(), handler);
        assert!(connection.disconnect());
        assert_eq!(Arc::strong_count(&browser), 1);
        // the aborted handler task drops its sender
        assert!(alive_rx.await.is_err());
        assert!(!connection.disconnect());
    }

    #[tokio::test]
    async fn dropping_the_connection_stops_the_handler() {
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let handler = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await
        });

        drop(CdpConnection::new((), handler));
        assert!(alive_rx.await.is_err());
    }
}

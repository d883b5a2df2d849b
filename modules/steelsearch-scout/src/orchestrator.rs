// ScrapeOrchestrator: one search-and-scrape run over one remote browser session.
//
// Idle → SessionAcquired → SearchPageLoaded → ResultsExtracted
//      → PerPageExtraction* → SessionReleased(Done)
//
// Any fatal error jumps to SessionReleased(Failed). Session release runs on
// every exit path; cancellation is covered by SessionGuard's Drop.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use steelsearch_common::{ScrapeRecord, SearchQuery};

use crate::content::extract_page_content;
use crate::observer::{ScrapeEvent, ScrapeObserver, TracingObserver};
use crate::results::extract_results;
use crate::search_page::{dismiss_consent, wait_for_results};
use crate::search_url::build_search_url;
use crate::session::SessionGuard;
use crate::timings::{pause, ScrapeTimings};
use crate::traits::{BrowserConnector, BrowserPage, SessionProvider};

/// Failures that abort a run. Per-page failures never appear here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to create session: {0}")]
    SessionCreation(String),

    #[error("Failed to connect to browser: {0}")]
    BrowserConnect(String),

    #[error("Search page failed to load: {0}")]
    SearchNavigation(String),
}

pub struct ScrapeOrchestrator {
    sessions: Arc<dyn SessionProvider>,
    connector: Arc<dyn BrowserConnector>,
    observer: Arc<dyn ScrapeObserver>,
    timings: ScrapeTimings,
}

impl ScrapeOrchestrator {
    pub fn new(sessions: Arc<dyn SessionProvider>, connector: Arc<dyn BrowserConnector>) -> Self {
        Self {
            sessions,
            connector,
            observer: Arc::new(TracingObserver),
            timings: ScrapeTimings::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScrapeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_timings(mut self, timings: ScrapeTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn timings(&self) -> &ScrapeTimings {
        &self.timings
    }

    /// Search, then deep-scrape each result in order.
    pub async fn run(&self, query: &SearchQuery) -> Result<Vec<ScrapeRecord>, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("scrape_run", %run_id, search_type = %query.search_type);
        self.run_inner(query).instrument(span).await
    }

    async fn run_inner(&self, query: &SearchQuery) -> Result<Vec<ScrapeRecord>, PipelineError> {
        info!(
            query = %query.query,
            language = %query.language,
            region = %query.region,
            time_filter = ?query.time_filter,
            num_results = query.num_results,
            "Starting search and extract"
        );

        let search_url = build_search_url(query);
        info!(search_url = %search_url, "Built search URL");

        let guard = match SessionGuard::acquire(self.sessions.clone(), self.observer.clone()).await {
            Ok(guard) => guard,
            Err(e) => return Err(self.fail(PipelineError::SessionCreation(format!("{e:#}")))),
        };

        let outcome = self.drive_session(&guard, query, &search_url).await;
        guard.release().await;

        match outcome {
            Ok(records) => {
                info!(total = records.len(), "Scraping completed");
                Ok(records)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn drive_session(
        &self,
        guard: &SessionGuard,
        query: &SearchQuery,
        search_url: &str,
    ) -> Result<Vec<ScrapeRecord>, PipelineError> {
        let page = self
            .connector
            .connect(guard.session())
            .await
            .map_err(|e| PipelineError::BrowserConnect(format!("{e:#}")))?;
        info!("Connected to browser");

        let outcome = self.scrape(page.as_ref(), query, search_url).await;

        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close browser connection");
        }
        outcome
    }

    async fn scrape(
        &self,
        page: &dyn BrowserPage,
        query: &SearchQuery,
        search_url: &str,
    ) -> Result<Vec<ScrapeRecord>, PipelineError> {
        let timings = &self.timings;

        page.navigate(search_url, timings.search_navigation)
            .await
            .map_err(|e| PipelineError::SearchNavigation(format!("{e:#}")))?;
        info!("Search page loaded");
        pause(timings.search_settle).await;

        dismiss_consent(page, timings).await;

        let tier = wait_for_results(page, timings)
            .await
            .map_err(|e| PipelineError::SearchNavigation(format!("{e:#}")))?;
        self.observer.on_event(&ScrapeEvent::SearchPageReady { tier });

        let items = extract_results(page, query.search_type, query.num_results).await;
        self.observer.on_event(&ScrapeEvent::ResultsExtracted { count: items.len() });

        let total = items.len();
        let mut records = Vec::with_capacity(total);
        for (idx, item) in items.into_iter().enumerate() {
            info!(position = item.position, total, url = %item.url, "Scraping page");

            let content = extract_page_content(page, &item.url, item.position, timings).await;
            self.observer.on_event(&ScrapeEvent::PageScraped {
                position: item.position,
                url: item.url.clone(),
                ok: !content.is_failed(),
            });
            records.push(ScrapeRecord::new(item, content, Utc::now()));

            if idx + 1 < total {
                pause(timings.politeness_delay).await;
            }
        }

        Ok(records)
    }

    fn fail(&self, err: PipelineError) -> PipelineError {
        self.observer.on_event(&ScrapeEvent::RunFailed {
            reason: err.to_string(),
        });
        err
    }
}

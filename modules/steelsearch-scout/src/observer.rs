// Structured run events, decoupled from control flow.

use tracing::{info, warn};

/// Which readiness signal the search page satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessTier {
    PrimaryContainer,
    SecondaryContainer,
    NetworkIdle,
}

impl std::fmt::Display for ReadinessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessTier::PrimaryContainer => write!(f, "primary_container"),
            ReadinessTier::SecondaryContainer => write!(f, "secondary_container"),
            ReadinessTier::NetworkIdle => write!(f, "network_idle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    SessionAcquired { session_id: String },
    SearchPageReady { tier: ReadinessTier },
    ResultsExtracted { count: usize },
    PageScraped { position: usize, url: String, ok: bool },
    SessionReleased { session_id: String, ok: bool },
    RunFailed { reason: String },
}

pub trait ScrapeObserver: Send + Sync {
    fn on_event(&self, event: &ScrapeEvent);
}

/// Default observer: one `tracing` event per pipeline event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScrapeObserver for TracingObserver {
    fn on_event(&self, event: &ScrapeEvent) {
        match event {
            ScrapeEvent::SessionAcquired { session_id } => {
                info!(session_id = %session_id, "Session acquired")
            }
            ScrapeEvent::SearchPageReady { tier } => {
                info!(tier = %tier, "Search results ready")
            }
            ScrapeEvent::ResultsExtracted { count } => {
                info!(count, "Result links extracted")
            }
            ScrapeEvent::PageScraped { position, url, ok: true } => {
                info!(position, url = %url, "Page scraped")
            }
            ScrapeEvent::PageScraped { position, url, ok: false } => {
                warn!(position, url = %url, "Page scrape failed, recorded as error")
            }
            ScrapeEvent::SessionReleased { session_id, ok: true } => {
                info!(session_id = %session_id, "Session released")
            }
            ScrapeEvent::SessionReleased { session_id, ok: false } => {
                warn!(session_id = %session_id, "Session release failed")
            }
            ScrapeEvent::RunFailed { reason } => {
                warn!(reason = %reason, "Scrape run failed")
            }
        }
    }
}

use std::time::Duration;

/// Per-operation time bounds for one pipeline run.
///
/// Navigation and readiness waits get long ceilings because remote browser
/// infrastructure is slow; settle and consent waits are short. Tests use
/// [`ScrapeTimings::immediate`] so runs finish without real sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeTimings {
    /// Loading the search results page.
    pub search_navigation: Duration,
    /// Pause after the search page loads, before consent handling.
    pub search_settle: Duration,
    /// Max time to find and click one consent affordance.
    pub consent_click: Duration,
    /// Pause after a consent click.
    pub consent_settle: Duration,
    /// Each readiness tier gets this long.
    pub readiness_tier: Duration,
    /// Loading one result page.
    pub page_navigation: Duration,
    /// Pause after a result page loads, for client-side rendering.
    pub page_settle: Duration,
    /// Pause between result pages.
    pub politeness_delay: Duration,
}

impl Default for ScrapeTimings {
    fn default() -> Self {
        Self {
            search_navigation: Duration::from_secs(180),
            search_settle: Duration::from_secs(2),
            consent_click: Duration::from_secs(2),
            consent_settle: Duration::from_secs(1),
            readiness_tier: Duration::from_secs(180),
            page_navigation: Duration::from_secs(180),
            page_settle: Duration::from_secs(3),
            politeness_delay: Duration::from_secs(2),
        }
    }
}

impl ScrapeTimings {
    /// All settle delays zeroed, waits bounded at one second.
    pub fn immediate() -> Self {
        let bound = Duration::from_secs(1);
        Self {
            search_navigation: bound,
            search_settle: Duration::ZERO,
            consent_click: bound,
            consent_settle: Duration::ZERO,
            readiness_tier: bound,
            page_navigation: bound,
            page_settle: Duration::ZERO,
            politeness_delay: Duration::ZERO,
        }
    }
}

/// Sleep unless the duration is zero.
pub(crate) async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

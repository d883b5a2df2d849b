// Getting the search results page into an extractable state:
// consent dismissal (best-effort) then a tiered readiness wait.

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::observer::ReadinessTier;
use crate::timings::{pause, ScrapeTimings};
use crate::traits::{BrowserPage, Locator};

/// Results container present on a normal results page.
pub const PRIMARY_RESULTS_SELECTOR: &str = "#search";
/// Inner results list, present on some layouts without `#search`.
pub const SECONDARY_RESULTS_SELECTOR: &str = "#rso";

/// Known cookie-consent buttons, tried in order.
pub fn consent_affordances() -> [Locator; 4] {
    [
        Locator::button_text("Accetta tutto"),
        Locator::button_text("Accept all"),
        Locator::button_text("Alles accepteren"),
        Locator::css(r#"button[id="L2AGLb"]"#),
    ]
}

/// Click the first consent affordance that responds. Never fails.
pub async fn dismiss_consent(page: &dyn BrowserPage, timings: &ScrapeTimings) -> Option<Locator> {
    for locator in consent_affordances() {
        match page.click(&locator, timings.consent_click).await {
            Ok(()) => {
                pause(timings.consent_settle).await;
                info!(locator = %locator, "Cookie consent accepted");
                return Some(locator);
            }
            Err(e) => debug!(locator = %locator, error = %e, "Consent affordance not clickable"),
        }
    }
    info!("No cookie consent button found (already accepted or not present)");
    None
}

/// Wait for results using each readiness tier in order; the first success wins.
pub async fn wait_for_results(
    page: &dyn BrowserPage,
    timings: &ScrapeTimings,
) -> Result<ReadinessTier> {
    let tiers = [
        (ReadinessTier::PrimaryContainer, Some(PRIMARY_RESULTS_SELECTOR)),
        (ReadinessTier::SecondaryContainer, Some(SECONDARY_RESULTS_SELECTOR)),
        (ReadinessTier::NetworkIdle, None),
    ];

    let mut last_error = None;
    for (tier, selector) in tiers {
        let outcome = match selector {
            Some(sel) => page.wait_for_selector(sel, timings.readiness_tier).await,
            None => page.wait_for_network_idle(timings.readiness_tier).await,
        };
        match outcome {
            Ok(()) => return Ok(tier),
            Err(e) => {
                warn!(tier = %tier, error = %e, "Readiness tier failed, trying next");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => bail!("search results never became ready: {e}"),
        None => bail!("search results never became ready"),
    }
}

// Result-link extraction from a rendered search results page.
//
// Result titles are headings wrapped in a link. Ads and widget headings are
// interleaved with real results, so up to twice the requested count is scanned
// and anything without a usable absolute link is skipped.

use tracing::{debug, info, warn};

use steelsearch_common::{is_http_url, ResultItem, SearchType};

use crate::traits::{BrowserPage, PageElement};

/// Headings on the news vertical.
pub const NEWS_TITLE_SELECTOR: &str = r#"div[role="heading"]"#;
/// Headings on the web vertical.
pub const WEB_TITLE_SELECTOR: &str = "h3";
/// Candidates scanned per requested result.
pub const CANDIDATE_SCAN_FACTOR: usize = 2;

pub fn title_selector(search_type: SearchType) -> &'static str {
    match search_type {
        SearchType::News => NEWS_TITLE_SELECTOR,
        SearchType::Web => WEB_TITLE_SELECTOR,
    }
}

/// Extract up to `num_results` ranked links. Never fails; an empty list is valid.
pub async fn extract_results(
    page: &dyn BrowserPage,
    search_type: SearchType,
    num_results: usize,
) -> Vec<ResultItem> {
    let selector = title_selector(search_type);
    let candidates = match page.query_all(selector).await {
        Ok(c) => c,
        Err(e) => {
            warn!(selector, error = %e, "Could not query result headings");
            return Vec::new();
        }
    };
    info!(selector, found = candidates.len(), "Result heading candidates found");

    let mut items = Vec::new();
    let scan_limit = num_results.saturating_mul(CANDIDATE_SCAN_FACTOR);

    for (idx, candidate) in candidates.iter().take(scan_limit).enumerate() {
        if items.len() >= num_results {
            break;
        }
        let Some((title, url)) = accept_candidate(candidate.as_ref(), idx).await else {
            continue;
        };
        let position = items.len() + 1;
        debug!(position, title = %title, url = %url, "Extracted result link");
        items.push(ResultItem { position, title, url });
    }

    info!(count = items.len(), requested = num_results, "Result links extracted");
    items
}

async fn accept_candidate(candidate: &dyn PageElement, idx: usize) -> Option<(String, String)> {
    let title = match candidate.inner_text().await {
        Ok(Some(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => return None,
        Err(e) => {
            debug!(candidate = idx, error = %e, "Skipping candidate, unreadable text");
            return None;
        }
    };

    let href = match candidate.closest_link_href().await {
        Ok(Some(href)) => href.trim().to_string(),
        Ok(None) => {
            debug!(candidate = idx, "Skipping candidate, no enclosing link");
            return None;
        }
        Err(e) => {
            debug!(candidate = idx, error = %e, "Skipping candidate, unreadable link");
            return None;
        }
    };

    if !is_http_url(&href) {
        debug!(candidate = idx, href = %href, "Skipping candidate, not an absolute http(s) link");
        return None;
    }

    Some((title, href))
}

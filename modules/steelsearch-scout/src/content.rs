// Deep content extraction for a single result page.
//
// Only a failed navigation marks the page as failed. Every later step
// degrades on its own: a step that errors contributes nothing and the rest
// still run.

use tracing::{debug, info, warn};

use steelsearch_common::{
    truncate_chars, PageContent, MAX_HEADINGS, MAX_MAIN_TEXT_CHARS, MAX_PARAGRAPHS,
    MIN_PARAGRAPH_CHARS,
};

use crate::timings::{pause, ScrapeTimings};
use crate::traits::{BrowserPage, PageElement};

/// Main-content candidates, semantic tags first, then common class/id conventions.
pub const CONTENT_REGION_SELECTORS: [&str; 9] = [
    "article",
    "main",
    r#"[role="main"]"#,
    ".article-content",
    ".post-content",
    ".content",
    "#content",
    ".article-body",
    ".entry-content",
];
pub const FALLBACK_REGION_SELECTOR: &str = "body";
pub const HEADING_SELECTOR: &str = "h1, h2, h3, h4";
pub const PARAGRAPH_SELECTOR: &str = "p";
pub const DESCRIPTION_SELECTOR: &str = r#"meta[name="description"]"#;

/// Navigate to `url` and extract its content. Never fails: a navigation
/// failure is returned as `PageContent::failed`.
pub async fn extract_page_content(
    page: &dyn BrowserPage,
    url: &str,
    position: usize,
    timings: &ScrapeTimings,
) -> PageContent {
    info!(position, url, "Navigating to result page");
    if let Err(e) = page.navigate(url, timings.page_navigation).await {
        warn!(position, url, error = %e, "Failed to load result page");
        return PageContent::failed(format!("{e:#}"));
    }
    pause(timings.page_settle).await;

    let mut content = PageContent {
        title: read_title(page, position).await,
        ..Default::default()
    };

    match locate_main_region(page).await {
        Some(region) => {
            content.headings = collect_headings(region.as_ref()).await;
            content.paragraphs = collect_paragraphs(region.as_ref()).await;
            content.main_text = read_main_text(region.as_ref(), position).await;
        }
        None => warn!(position, "Page has no body, skipping region extraction"),
    }

    if let Some(description) = read_description(page).await {
        content.metadata.insert("description".to_string(), description);
    }

    info!(
        position,
        headings = content.headings.len(),
        paragraphs = content.paragraphs.len(),
        chars = content.main_text.chars().count(),
        "Content extraction complete"
    );
    content
}

async fn read_title(page: &dyn BrowserPage, position: usize) -> String {
    match page.title().await {
        Ok(title) => title.unwrap_or_default(),
        Err(e) => {
            debug!(position, error = %e, "Could not read page title");
            String::new()
        }
    }
}

/// First matching content-region selector, else the document body.
pub async fn locate_main_region(page: &dyn BrowserPage) -> Option<Box<dyn PageElement>> {
    for selector in CONTENT_REGION_SELECTORS {
        match page.query(selector).await {
            Ok(Some(region)) => {
                debug!(selector, "Found main content region");
                return Some(region);
            }
            Ok(None) => {}
            Err(e) => debug!(selector, error = %e, "Region selector failed"),
        }
    }
    debug!("Using body as main content");
    page.query(FALLBACK_REGION_SELECTOR).await.ok().flatten()
}

async fn collect_headings(region: &dyn PageElement) -> Vec<String> {
    let elements = match region.query_all(HEADING_SELECTOR).await {
        Ok(els) => els,
        Err(e) => {
            debug!(error = %e, "Heading query failed");
            return Vec::new();
        }
    };

    let mut headings = Vec::new();
    for el in elements.iter().take(MAX_HEADINGS) {
        if let Ok(Some(text)) = el.inner_text().await {
            let text = text.trim();
            if !text.is_empty() {
                headings.push(text.to_string());
            }
        }
    }
    headings
}

async fn collect_paragraphs(region: &dyn PageElement) -> Vec<String> {
    let elements = match region.query_all(PARAGRAPH_SELECTOR).await {
        Ok(els) => els,
        Err(e) => {
            debug!(error = %e, "Paragraph query failed");
            return Vec::new();
        }
    };

    let mut paragraphs = Vec::new();
    for el in elements.iter().take(MAX_PARAGRAPHS) {
        if let Ok(Some(text)) = el.inner_text().await {
            let text = text.trim();
            if text.chars().count() > MIN_PARAGRAPH_CHARS {
                paragraphs.push(text.to_string());
            }
        }
    }
    paragraphs
}

async fn read_main_text(region: &dyn PageElement, position: usize) -> String {
    match region.inner_text().await {
        Ok(Some(text)) => {
            let text = text.trim();
            let kept = truncate_chars(text, MAX_MAIN_TEXT_CHARS);
            debug!(
                position,
                extracted = text.chars().count(),
                stored = kept.chars().count(),
                "Extracted main text"
            );
            kept.to_string()
        }
        Ok(None) => String::new(),
        Err(e) => {
            debug!(position, error = %e, "Could not read main text");
            String::new()
        }
    }
}

async fn read_description(page: &dyn BrowserPage) -> Option<String> {
    let meta = page.query(DESCRIPTION_SELECTOR).await.ok().flatten()?;
    let value = meta.attribute("content").await.ok().flatten()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockElement, MockPage};

    fn long_paragraph(n: usize) -> String {
        format!("Paragraph number {n} with enough words to count as content.")
    }

    #[tokio::test]
    async fn article_region_wins_over_body() {
        let article = MockElement::text("Article body text")
            .with_children(HEADING_SELECTOR, vec![MockElement::text("Lineups announced")])
            .with_children(PARAGRAPH_SELECTOR, vec![MockElement::text(&long_paragraph(1))]);
        let body = MockElement::text("Whole page including nav and footer");
        let page = MockPage::new("Match preview")
            .with_elements("article", vec![article])
            .with_elements("body", vec![body])
            .with_elements(
                DESCRIPTION_SELECTOR,
                vec![MockElement::text("").with_attr("content", "Probable lineups")],
            );

        let content = extract_page_content(&page, "https://x.example/", 1, &ScrapeTimings::immediate()).await;

        assert_eq!(content.error, None);
        assert_eq!(content.title, "Match preview");
        assert_eq!(content.headings, vec!["Lineups announced"]);
        assert_eq!(content.paragraphs, vec![long_paragraph(1)]);
        assert_eq!(content.main_text, "Article body text");
        assert_eq!(content.metadata.get("description").map(String::as_str), Some("Probable lineups"));
    }

    #[tokio::test]
    async fn class_conventions_are_tried_in_order() {
        let page = MockPage::new("Blog")
            .with_elements(".entry-content", vec![MockElement::text("entry")])
            .with_elements(".post-content", vec![MockElement::text("post")])
            .with_elements("body", vec![MockElement::text("body")]);

        let content = extract_page_content(&page, "https://blog.example/", 1, &ScrapeTimings::immediate()).await;
        assert_eq!(content.main_text, "post");
    }

    #[tokio::test]
    async fn falls_back_to_body() {
        let page = MockPage::new("Plain")
            .with_elements("body", vec![MockElement::text("  just the body  ")]);

        let content = extract_page_content(&page, "https://plain.example/", 1, &ScrapeTimings::immediate()).await;
        assert_eq!(content.main_text, "just the body");
        assert!(content.metadata.is_empty());
    }

    #[tokio::test]
    async fn caps_and_short_paragraph_filter_hold() {
        let headings: Vec<MockElement> = (0..40)
            .map(|i| MockElement::text(if i % 5 == 0 { " " } else { "Heading" }))
            .collect();
        let mut paragraphs: Vec<MockElement> = vec![
            MockElement::text("Too short."),
            MockElement::text("exactly twenty chars"),
            MockElement::broken(),
        ];
        paragraphs.extend((0..60).map(|i| MockElement::text(&long_paragraph(i))));
        let body = MockElement::text(&"x".repeat(MAX_MAIN_TEXT_CHARS + 500))
            .with_children(HEADING_SELECTOR, headings)
            .with_children(PARAGRAPH_SELECTOR, paragraphs);
        let page = MockPage::new("Huge").with_elements("body", vec![body]);

        let content = extract_page_content(&page, "https://huge.example/", 1, &ScrapeTimings::immediate()).await;

        // first 30 heading nodes, of which every fifth is blank
        assert_eq!(content.headings.len(), 24);
        assert!(content.paragraphs.len() <= MAX_PARAGRAPHS);
        assert_eq!(content.paragraphs.len(), 47);
        assert!(content.paragraphs.iter().all(|p| p.trim().chars().count() > MIN_PARAGRAPH_CHARS));
        assert_eq!(content.main_text.chars().count(), MAX_MAIN_TEXT_CHARS);
    }

    #[tokio::test]
    async fn missing_title_is_empty_string() {
        let page = MockPage::untitled().with_elements("body", vec![MockElement::text("content")]);
        let content = extract_page_content(&page, "https://untitled.example/", 1, &ScrapeTimings::immediate()).await;
        assert_eq!(content.title, "");
        assert_eq!(content.error, None);
    }

    #[tokio::test]
    async fn broken_region_text_only_drops_main_text() {
        let body = MockElement::broken()
            .with_children(PARAGRAPH_SELECTOR, vec![MockElement::text(&long_paragraph(7))]);
        let page = MockPage::new("Flaky").with_elements("body", vec![body]);

        let content = extract_page_content(&page, "https://flaky.example/", 1, &ScrapeTimings::immediate()).await;
        assert_eq!(content.error, None);
        assert_eq!(content.main_text, "");
        assert_eq!(content.paragraphs.len(), 1);
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SteelSearchError;

// --- Limits ---

/// Upper bound on `SearchQuery::num_results`.
pub const MAX_NUM_RESULTS: usize = 20;
/// Max headings kept per page.
pub const MAX_HEADINGS: usize = 30;
/// Max paragraphs kept per page.
pub const MAX_PARAGRAPHS: usize = 50;
/// Paragraphs whose trimmed length is at or below this are dropped.
pub const MIN_PARAGRAPH_CHARS: usize = 20;
/// `main_text` is truncated to this many characters.
pub const MAX_MAIN_TEXT_CHARS: usize = 20_000;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    Web,
    News,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Web => write!(f, "web"),
            SearchType::News => write!(f, "news"),
        }
    }
}

impl FromStr for SearchType {
    type Err = SteelSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(SearchType::Web),
            "news" => Ok(SearchType::News),
            other => Err(SteelSearchError::Validation(format!(
                "search_type must be 'web' or 'news', got {other:?}"
            ))),
        }
    }
}

/// Recency window applied to a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TimeFilter {
    #[serde(rename = "hour")]
    Hour,
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "3days")]
    ThreeDays,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "year")]
    Year,
}

impl TimeFilter {
    pub const ALL: [TimeFilter; 6] = [
        TimeFilter::Hour,
        TimeFilter::Day,
        TimeFilter::ThreeDays,
        TimeFilter::Week,
        TimeFilter::Month,
        TimeFilter::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::ThreeDays => "3days",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
        }
    }

    /// Lenient parse: `"none"`, empty and unrecognized values mean no filter.
    pub fn parse_lenient(s: &str) -> Option<TimeFilter> {
        s.parse().ok()
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = SteelSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeFilter::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                SteelSearchError::Validation(format!(
                    "time_filter must be one of: hour, day, 3days, week, month, year (got {s:?})"
                ))
            })
    }
}

// --- Pipeline input ---

/// Structured search request handed to the scrape pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    pub query: String,
    pub language: String,
    pub region: String,
    pub search_type: SearchType,
    pub time_filter: Option<TimeFilter>,
    pub num_results: usize,
}

impl SearchQuery {
    /// Construct a query, rejecting empty text and out-of-range result counts.
    pub fn new(
        query: impl Into<String>,
        language: impl Into<String>,
        region: impl Into<String>,
        search_type: SearchType,
        time_filter: Option<TimeFilter>,
        num_results: usize,
    ) -> Result<Self, SteelSearchError> {
        let q = Self {
            query: query.into(),
            language: language.into(),
            region: region.into(),
            search_type,
            time_filter,
            num_results,
        };
        q.validate()?;
        Ok(q)
    }

    pub fn validate(&self) -> Result<(), SteelSearchError> {
        if self.query.trim().is_empty() {
            return Err(SteelSearchError::Validation("query must not be empty".into()));
        }
        if !(1..=MAX_NUM_RESULTS).contains(&self.num_results) {
            return Err(SteelSearchError::Validation(format!(
                "num_results must be between 1 and {MAX_NUM_RESULTS}, got {}",
                self.num_results
            )));
        }
        Ok(())
    }
}

// --- Pipeline output ---

/// A ranked link discovered on the search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResultItem {
    /// 1-based, contiguous.
    pub position: usize,
    pub title: String,
    pub url: String,
}

/// Content extracted from a single result page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PageContent {
    pub title: String,
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
    pub main_text: String,
    pub metadata: BTreeMap<String, String>,
    pub error: Option<String>,
}

impl PageContent {
    /// Content for a page whose navigation failed. All other fields stay empty.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One result link merged with its deep-extracted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeRecord {
    pub position: usize,
    pub search_title: String,
    pub url: String,
    pub page_title: String,
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
    pub main_text: String,
    pub metadata: BTreeMap<String, String>,
    pub error: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapeRecord {
    pub fn new(item: ResultItem, content: PageContent, scraped_at: DateTime<Utc>) -> Self {
        Self {
            position: item.position,
            search_title: item.title,
            url: item.url,
            page_title: content.title,
            headings: content.headings,
            paragraphs: content.paragraphs,
            main_text: content.main_text,
            metadata: content.metadata,
            error: content.error,
            scraped_at,
        }
    }
}

// --- Helpers ---

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// True for absolute `http://` or `https://` URLs.
pub fn is_http_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    (lower.starts_with("http://") && lower.len() > "http://".len())
        || (lower.starts_with("https://") && lower.len() > "https://".len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_filter_round_trips_through_its_wire_name() {
        for filter in TimeFilter::ALL {
            assert_eq!(filter.as_str().parse::<TimeFilter>().unwrap(), filter);
        }
        let json = serde_json::to_string(&TimeFilter::ThreeDays).unwrap();
        assert_eq!(json, "\"3days\"");
    }

    #[test]
    fn lenient_time_filter_treats_none_and_garbage_as_absent() {
        assert_eq!(TimeFilter::parse_lenient("none"), None);
        assert_eq!(TimeFilter::parse_lenient(""), None);
        assert_eq!(TimeFilter::parse_lenient("fortnight"), None);
        assert_eq!(TimeFilter::parse_lenient("week"), Some(TimeFilter::Week));
    }

    #[test]
    fn search_type_rejects_unknown_values() {
        assert_eq!("news".parse::<SearchType>().unwrap(), SearchType::News);
        assert!("images".parse::<SearchType>().is_err());
    }

    #[test]
    fn query_validation_enforces_result_bounds() {
        let ok = SearchQuery::new("test", "en", "us", SearchType::Web, None, 20);
        assert!(ok.is_ok());
        let zero = SearchQuery::new("test", "en", "us", SearchType::Web, None, 0);
        assert!(matches!(zero, Err(SteelSearchError::Validation(_))));
        let many = SearchQuery::new("test", "en", "us", SearchType::Web, None, 21);
        assert!(many.is_err());
        let blank = SearchQuery::new("   ", "en", "us", SearchType::Web, None, 3);
        assert!(blank.is_err());
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("perché no", 6), "perché");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 0), "");
        let long = "é".repeat(MAX_MAIN_TEXT_CHARS + 5);
        assert_eq!(truncate_chars(&long, MAX_MAIN_TEXT_CHARS).chars().count(), MAX_MAIN_TEXT_CHARS);
    }

    #[test]
    fn http_url_check_rejects_relative_and_other_schemes() {
        assert!(is_http_url("https://example.com/a"));
        assert!(is_http_url("HTTP://example.com"));
        assert!(!is_http_url("/url?q=foo"));
        assert!(!is_http_url("javascript:void(0)"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn failed_record_carries_error_and_empty_content() {
        let item = ResultItem {
            position: 2,
            title: "Down".into(),
            url: "https://down.example".into(),
        };
        let record = ScrapeRecord::new(item, PageContent::failed("net::ERR_NAME_NOT_RESOLVED"), Utc::now());
        assert_eq!(record.position, 2);
        assert_eq!(record.error.as_deref(), Some("net::ERR_NAME_NOT_RESOLVED"));
        assert!(record.headings.is_empty());
        assert!(record.paragraphs.is_empty());
        assert!(record.main_text.is_empty());
    }
}

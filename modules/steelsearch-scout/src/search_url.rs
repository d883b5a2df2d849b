// Search URL construction. Pure; no I/O.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use steelsearch_common::{SearchQuery, SearchType, TimeFilter};

pub const SEARCH_BASE_URL: &str = "https://www.google.com/search";

/// Everything except RFC 3986 unreserved characters and `/` is encoded.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Recency token for a time filter. `None` adds nothing to the URL.
pub fn recency_token(filter: Option<TimeFilter>) -> Option<&'static str> {
    Some(match filter? {
        TimeFilter::Hour => "qdr:h",
        TimeFilter::Day => "qdr:d",
        TimeFilter::ThreeDays => "qdr:d3",
        TimeFilter::Week => "qdr:w",
        TimeFilter::Month => "qdr:m",
        TimeFilter::Year => "qdr:y",
    })
}

/// Build the fully-filtered results URL for a query.
pub fn build_search_url(query: &SearchQuery) -> String {
    let lang_restrict = format!("lang_{}", query.language);

    let mut params: Vec<(&str, &str)> = vec![
        ("q", query.query.as_str()),
        ("hl", query.language.as_str()),
        ("lr", lang_restrict.as_str()),
        ("gl", query.region.as_str()),
    ];

    if query.search_type == SearchType::News {
        params.push(("tbm", "nws"));
    }

    if let Some(token) = recency_token(query.time_filter) {
        params.push(("tbs", token));
    }

    let encoded = params
        .iter()
        .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, QUERY_VALUE)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{SEARCH_BASE_URL}?{encoded}")
}

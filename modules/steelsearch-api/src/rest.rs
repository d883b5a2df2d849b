use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use steelsearch_common::{ScrapeRecord, SearchQuery, SearchType, SteelSearchError, TimeFilter};

use crate::AppState;

// --- Request / response bodies ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    /// Search query text.
    pub query: String,
    /// Interface and result language code.
    #[serde(default = "default_locale")]
    pub language: String,
    /// Region code.
    #[serde(default = "default_locale")]
    pub region: String,
    /// `web` or `news`.
    #[serde(default = "default_search_type")]
    pub search_type: String,
    /// `none`, `hour`, `day`, `3days`, `week`, `month` or `year`.
    #[serde(default)]
    pub time_filter: Option<String>,
    /// Results to scrape, 1 to 20.
    #[serde(default = "default_num_results")]
    pub num_results: i64,
}

fn default_locale() -> String {
    "it".to_string()
}

fn default_search_type() -> String {
    SearchType::Web.to_string()
}

fn default_num_results() -> i64 {
    5
}

impl SearchRequest {
    /// Validate and convert into a pipeline query.
    pub fn into_query(self) -> Result<SearchQuery, SteelSearchError> {
        let search_type: SearchType = self.search_type.parse()?;
        let time_filter = match self.time_filter.as_deref().map(str::trim) {
            None | Some("") | Some("none") => None,
            Some(raw) => Some(raw.parse::<TimeFilter>()?),
        };
        let num_results = usize::try_from(self.num_results).map_err(|_| {
            SteelSearchError::Validation(format!(
                "num_results must be between 1 and {}, got {}",
                steelsearch_common::MAX_NUM_RESULTS,
                self.num_results
            ))
        })?;
        SearchQuery::new(
            self.query,
            self.language,
            self.region,
            search_type,
            time_filter,
            num_results,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    pub query: String,
    pub language: String,
    pub region: String,
    pub search_type: SearchType,
    pub time_filter: Option<TimeFilter>,
    pub scraped_at: DateTime<Utc>,
    pub total_results: usize,
    pub results: Vec<ScrapeRecord>,
}

// --- Helpers ---

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "detail": message.into() }))).into_response()
}

fn validation_message(err: SteelSearchError) -> String {
    match err {
        SteelSearchError::Validation(msg) | SteelSearchError::Config(msg) => msg,
    }
}

// --- HTTP handlers ---

pub async fn api_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Steel Search API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Search the web through a remote browser and extract the content of each result",
        "endpoints": {
            "GET /": "Service information",
            "GET /health": "Health check",
            "POST /search": "Search and scrape result pages",
            "GET /schema": "JSON schemas for the search request and response",
        },
    }))
}

pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "steel_url": state.steel_url,
        "timestamp": Utc::now(),
    }))
}

pub async fn api_schema() -> impl IntoResponse {
    Json(serde_json::json!({
        "SearchRequest": schemars::schema_for!(SearchRequest),
        "SearchResponse": schemars::schema_for!(SearchResponse),
    }))
}

pub async fn api_search(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return detail(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let query = match request.into_query() {
        Ok(query) => query,
        Err(e) => {
            let message = validation_message(e);
            info!(reason = %message, "Rejected search request");
            return detail(StatusCode::BAD_REQUEST, message);
        }
    };

    match state.runner.run(&query).await {
        Ok(results) => Json(SearchResponse {
            query: query.query,
            language: query.language,
            region: query.region,
            search_type: query.search_type,
            time_filter: query.time_filter,
            scraped_at: Utc::now(),
            total_results: results.len(),
            results,
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Search request failed");
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Scraping failed: {e}"),
            )
        }
    }
}

pub mod rest;
pub mod runner;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

pub use runner::{SearchRunner, SteelSearchRunner};

pub struct AppState {
    pub runner: Arc<dyn SearchRunner>,
    pub steel_url: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(rest::api_info))
        .route("/health", get(rest::api_health))
        .route("/search", post(rest::api_search))
        .route("/schema", get(rest::api_schema))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // method + path + status + latency; request bodies carry queries and stay out of logs
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

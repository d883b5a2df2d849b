use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use steelsearch_api::{router, AppState, SearchRunner};
use steelsearch_common::{ScrapeRecord, SearchQuery, SearchType, TimeFilter};
use steelsearch_scout::PipelineError;

enum Outcome {
    Records(usize),
    Fails(fn() -> PipelineError),
}

struct StubRunner {
    outcome: Outcome,
    seen: Mutex<Vec<SearchQuery>>,
}

impl StubRunner {
    fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<SearchQuery> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchRunner for StubRunner {
    async fn run(&self, query: &SearchQuery) -> Result<Vec<ScrapeRecord>, PipelineError> {
        self.seen.lock().unwrap().push(query.clone());
        match &self.outcome {
            Outcome::Records(n) => Ok((1..=*n)
                .map(|position| ScrapeRecord {
                    position,
                    search_title: format!("Result {position}"),
                    url: format!("https://r{position}.example/"),
                    page_title: format!("Page {position}"),
                    headings: vec!["Heading".into()],
                    paragraphs: vec!["A paragraph that is long enough to keep.".into()],
                    main_text: "Body".into(),
                    metadata: BTreeMap::new(),
                    error: None,
                    scraped_at: Utc::now(),
                })
                .collect()),
            Outcome::Fails(make) => Err(make()),
        }
    }
}

fn app(runner: Arc<StubRunner>) -> axum::Router {
    router(Arc::new(AppState {
        runner,
        steel_url: "https://steel.test".into(),
    }))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn post_search(body: serde_json::Value) -> Request<Body> {
    Request::post("/search")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn search_returns_records_and_echoes_the_query() {
    let runner = StubRunner::new(Outcome::Records(3));
    let (status, json) = send(
        app(runner.clone()),
        post_search(serde_json::json!({
            "query": "test",
            "language": "en",
            "region": "us",
            "search_type": "news",
            "time_filter": "week",
            "num_results": 3
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "test");
    assert_eq!(json["search_type"], "news");
    assert_eq!(json["time_filter"], "week");
    assert_eq!(json["total_results"], 3);
    assert_eq!(json["results"].as_array().unwrap().len(), 3);
    assert_eq!(json["results"][0]["position"], 1);
    assert_eq!(json["results"][0]["search_title"], "Result 1");
    assert!(json["results"][0]["error"].is_null());
    assert!(json["scraped_at"].is_string());

    let seen = runner.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].search_type, SearchType::News);
    assert_eq!(seen[0].time_filter, Some(TimeFilter::Week));
    assert_eq!(seen[0].num_results, 3);
}

#[tokio::test]
async fn defaults_apply_to_a_bare_query() {
    let runner = StubRunner::new(Outcome::Records(5));
    let (status, json) = send(app(runner.clone()), post_search(serde_json::json!({"query": "meteo"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["language"], "it");
    assert_eq!(json["region"], "it");
    assert_eq!(json["search_type"], "web");
    assert!(json["time_filter"].is_null());
    assert_eq!(runner.seen()[0].num_results, 5);
}

#[tokio::test]
async fn explicit_none_time_filter_is_accepted() {
    let runner = StubRunner::new(Outcome::Records(1));
    let (status, json) = send(
        app(runner.clone()),
        post_search(serde_json::json!({"query": "x", "time_filter": "none"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {json}");
    assert!(json["time_filter"].is_null());
    assert_eq!(runner.seen()[0].time_filter, None);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_scraping() {
    for body in [
        serde_json::json!({"query": "x", "num_results": 25}),
        serde_json::json!({"query": "x", "search_type": "images"}),
        serde_json::json!({"query": "x", "time_filter": "fortnight"}),
        serde_json::json!({"query": ""}),
        serde_json::json!({"language": "en"}),
    ] {
        let runner = StubRunner::new(Outcome::Records(1));
        let (status, json) = send(app(runner.clone()), post_search(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert!(json["detail"].is_string(), "body: {body}");
        assert!(runner.seen().is_empty());
    }
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let runner = StubRunner::new(Outcome::Records(1));
    let request = Request::post("/search")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(app(runner), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].is_string());
}

#[tokio::test]
async fn pipeline_failure_is_a_server_error() {
    let runner = StubRunner::new(Outcome::Fails(|| {
        PipelineError::SessionCreation("provider returned 503".into())
    }));
    let (status, json) = send(app(runner), post_search(serde_json::json!({"query": "x"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.starts_with("Scraping failed: "));
    assert!(detail.contains("503"));
}

#[tokio::test]
async fn zero_results_is_still_ok() {
    let runner = StubRunner::new(Outcome::Records(0));
    let (status, json) = send(app(runner), post_search(serde_json::json!({"query": "nothing"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_results"], 0);
    assert_eq!(json["results"], serde_json::json!([]));
}

#[tokio::test]
async fn health_reports_the_session_provider() {
    let runner = StubRunner::new(Outcome::Records(0));
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, json) = send(app(runner), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["steel_url"], "https://steel.test");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn info_and_schema_are_served() {
    let runner = StubRunner::new(Outcome::Records(0));
    let (status, info) = send(app(runner.clone()), Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(info["endpoints"]["POST /search"].is_string());

    let (status, schema) = send(app(runner), Request::get("/schema").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(schema["SearchRequest"]["properties"]["query"].is_object());
    assert!(schema["SearchResponse"]["properties"]["results"].is_object());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let runner = StubRunner::new(Outcome::Records(0));
    let request = Request::get("/health")
        .header("origin", "https://somewhere.example")
        .body(Body::empty())
        .unwrap();
    let response = app(runner).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

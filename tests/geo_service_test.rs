//! Country service client tests
//!
//! A local axum server stands in for the REST Countries API so the client,
//! the retry layer and the cache can be exercised over real HTTP.

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use salesmart::config::GeoConfig;
use salesmart::geo::{self, GeoError, GeoInfo, GeoLookup, ResilientLookup, RestCountriesClient, RetryPolicy};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    hits: Mutex<HashMap<String, usize>>,
    queries: Mutex<Vec<Option<String>>>,
}

impl MockState {
    fn hits(&self, name: &str) -> usize {
        self.hits.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

async fn country(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let hit = {
        let mut hits = state.hits.lock().unwrap();
        let count = hits.entry(name.clone()).or_insert(0);
        *count += 1;
        *count
    };
    state.queries.lock().unwrap().push(query);

    match name.as_str() {
        "united kingdom" => Json(json!([{"capital": ["London"], "latlng": [54.0, -2.0]}])).into_response(),
        "india" => Json(json!([{"capital": "New Delhi", "latlng": [20.0, 77.0]}])).into_response(),
        "flaky" if hit <= 2 => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "flaky" => Json(json!([{"capital": ["Flakeville"], "latlng": [1.0, 2.0]}])).into_response(),
        "down" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "broken" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "empty" => Json(json!([])).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"status": 404, "message": "Not Found"}))).into_response(),
    }
}

async fn spawn_mock() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let app = Router::new().route("/v3.1/name/:name", get(country)).with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v3.1", addr), state)
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_resolves_capital_and_coordinates() {
    let (base_url, state) = spawn_mock().await;
    let client = RestCountriesClient::new(&base_url).unwrap();

    let uk = client.resolve("united kingdom").await.unwrap();
    assert_eq!(uk, GeoInfo::new("London", 54.0, -2.0));
    let india = client.resolve("india").await.unwrap();
    assert_eq!(india, GeoInfo::new("New Delhi", 20.0, 77.0));

    let queries = state.queries.lock().unwrap().clone();
    assert!(queries.iter().all(|q| q.as_deref() == Some("fullText=true")));
}

#[tokio::test]
async fn test_not_found_and_empty_answers() {
    let (base_url, _state) = spawn_mock().await;
    let client = RestCountriesClient::new(&base_url).unwrap();

    assert_eq!(client.resolve("atlantis").await, Err(GeoError::NotFound("atlantis".to_string())));
    assert_eq!(client.resolve("empty").await, Err(GeoError::NotFound("empty".to_string())));
}

#[tokio::test]
async fn test_bad_payload_is_unavailable() {
    let (base_url, _state) = spawn_mock().await;
    let client = RestCountriesClient::new(&base_url).unwrap();

    let err = client.resolve("broken").await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_retry_recovers_from_transient_failures() {
    let (base_url, state) = spawn_mock().await;
    let lookup = ResilientLookup::new(RestCountriesClient::new(&base_url).unwrap(), fast_retries(3));

    let info = lookup.resolve("flaky").await.unwrap();
    assert_eq!(info.capital, "Flakeville");
    assert_eq!(state.hits("flaky"), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let (base_url, state) = spawn_mock().await;
    let lookup = ResilientLookup::new(RestCountriesClient::new(&base_url).unwrap(), fast_retries(2));

    let err = lookup.resolve("down").await.unwrap_err();
    assert!(matches!(err, GeoError::Unavailable { ref name, .. } if name == "down"));
    assert_eq!(state.hits("down"), 3);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let (base_url, state) = spawn_mock().await;
    let lookup = ResilientLookup::new(RestCountriesClient::new(&base_url).unwrap(), fast_retries(3));

    assert!(matches!(lookup.resolve("atlantis").await, Err(GeoError::NotFound(_))));
    assert_eq!(state.hits("atlantis"), 1);
}

#[tokio::test]
async fn test_configured_stack_caches_answers() {
    let (base_url, state) = spawn_mock().await;
    let config = GeoConfig { base_url, initial_backoff_ms: 5, max_backoff_ms: 20, ..GeoConfig::default() };
    let lookup = geo::from_config(&config).unwrap();

    lookup.resolve("india").await.unwrap();
    lookup.resolve("india").await.unwrap();
    assert_eq!(state.hits("india"), 1);
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RestCountriesClient::new(&format!("http://{}/v3.1", addr)).unwrap();
    assert!(client.resolve("india").await.unwrap_err().is_retryable());
}

use axum::{Json, Router, http::HeaderMap, routing::post};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::net::TcpListener;

use quarry_domain::SearchTerms;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		quarry_providers::auth_headers(Some("secret"), &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn omits_auth_header_without_key() {
	let mut defaults = Map::new();

	defaults.insert("x-index-tenant".to_string(), Value::String("images".to_string()));

	let headers =
		quarry_providers::auth_headers(None, &defaults).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
	assert_eq!(headers.get("x-index-tenant").expect("Missing default header."), "images");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = quarry_providers::auth_headers(None, &defaults).expect_err("Expected config error.");

	assert!(matches!(err, quarry_providers::Error::InvalidConfig { .. }));
}

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
	let auth = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);

	Json(serde_json::json!({
		"total_hits": 7,
		"results": [{ "echo": body, "auth": auth }]
	}))
}

#[tokio::test]
async fn posts_terms_offset_and_limit() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener.");
	let addr = listener.local_addr().expect("Failed to read listener address.");
	let server = tokio::spawn(async move {
		axum::serve(listener, Router::new().route("/query", post(echo))).await
	});
	let cfg = quarry_config::Index {
		api_base: format!("http://{addr}/"),
		path: "/query".to_string(),
		api_key: Some("index-key".to_string()),
		timeout_ms: 2_000,
		default_headers: Map::new(),
	};
	let terms = SearchTerms { q: Some("sunset".to_string()), ..Default::default() };
	let page = quarry_providers::index::query(&cfg, &terms, 40, 20)
		.await
		.expect("Index query failed.");

	server.abort();

	assert_eq!(page.total_hits, 7);
	assert_eq!(
		page.results[0]["echo"],
		serde_json::json!({ "terms": { "q": "sunset" }, "offset": 40, "limit": 20 })
	);
	assert_eq!(page.results[0]["auth"], "Bearer index-key");
}

#[tokio::test]
async fn connection_failures_are_retryable() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener.");
	let addr = listener.local_addr().expect("Failed to read listener address.");

	drop(listener);

	let cfg = quarry_config::Index {
		api_base: format!("http://{addr}"),
		path: "/query".to_string(),
		api_key: None,
		timeout_ms: 500,
		default_headers: Map::new(),
	};
	let err = quarry_providers::index::query(&cfg, &SearchTerms::default(), 0, 20)
		.await
		.expect_err("Expected a connection error.");

	assert!(err.is_retryable(), "Unexpected error: {err}");
}

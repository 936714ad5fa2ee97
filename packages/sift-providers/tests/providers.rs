use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use sift_config::EmbeddingProviderConfig;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		sift_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn copies_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-org".to_string(), Value::String("acme".to_string()));

	let headers =
		sift_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get("x-org").expect("Missing default header."), "acme");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = sift_providers::auth_headers("secret", &defaults)
		.expect_err("Expected non-string header error.");

	assert!(err.to_string().contains("x-retries"), "Unexpected error: {err}");
}

#[tokio::test]
async fn unreachable_provider_surfaces_transport_error() {
	let cfg = EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		api_key: "test-key".to_string(),
		path: "/embeddings".to_string(),
		model: "test".to_string(),
		dimensions: 8,
		timeout_ms: 500,
		default_headers: Map::new(),
	};
	let result = sift_providers::embedding::embed(&cfg, &["query".to_string()]).await;

	assert!(matches!(result, Err(sift_providers::Error::Reqwest(_))), "Unexpected: {result:?}");
}

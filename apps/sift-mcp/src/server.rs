use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use color_eyre::Result;
use reqwest::Client;
use rmcp::{
	ErrorData, ServerHandler,
	handler::server::router::tool::ToolRouter,
	model::{CallToolResult, JsonObject, ServerCapabilities, ServerInfo},
	transport::streamable_http_server::{
		StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
	},
};
use serde_json::Value;
use tokio::net::TcpListener;

use sift_config::McpContext;

const HEADER_TENANT_ID: &str = "X-Sift-Tenant-Id";

#[derive(Clone)]
struct SiftMcp {
	api_base: String,
	client: Client,
	tenant_id: String,
	tool_router: ToolRouter<Self>,
}
impl SiftMcp {
	fn new(api_base: String, tenant_id: String) -> Self {
		Self { api_base, client: Client::new(), tenant_id, tool_router: Self::tool_router() }
	}

	async fn forward_post(&self, path: &str, body: Value) -> Result<CallToolResult, ErrorData> {
		let url = format!("{}{}", self.api_base, path);
		let response = self
			.client
			.post(url)
			.header(HEADER_TENANT_ID, self.tenant_id.as_str())
			.json(&body)
			.send()
			.await
			.map_err(|err| {
				ErrorData::internal_error(format!("Sift API request failed: {err}"), None)
			})?;

		handle_response(response).await
	}
}

#[rmcp::tool_router]
impl SiftMcp {
	#[rmcp::tool(
		name = "sift_hybrid_search",
		description = "Search one knowledge base with combined keyword and vector matching.",
		input_schema = hybrid_search_schema()
	)]
	async fn sift_hybrid_search(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let knowledge_base_id = take_required_string(&mut params, "knowledge_base_id")?;
		let path = hybrid_search_path(&knowledge_base_id)?;

		self.forward_post(&path, Value::Object(params)).await
	}

	#[rmcp::tool(
		name = "sift_database_query",
		description = "Run one read-only SELECT against the tenant's knowledge base tables.",
		input_schema = database_query_schema()
	)]
	async fn sift_database_query(&self, params: JsonObject) -> Result<CallToolResult, ErrorData> {
		self.forward_post("/v1/tools/database_query", Value::Object(params)).await
	}
}

#[rmcp::tool_handler]
impl ServerHandler for SiftMcp {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			instructions: Some(
				"Sift exposes hybrid search over knowledge bases and tenant-scoped read-only SQL."
					.to_string(),
			),
			capabilities: ServerCapabilities::builder().enable_tools().build(),
			..Default::default()
		}
	}
}

pub async fn serve_mcp(bind_addr: &str, api_base: &str, mcp_context: &McpContext) -> Result<()> {
	let bind_addr: SocketAddr = bind_addr.parse()?;
	let api_base = normalize_api_base(api_base);
	let tenant_id = mcp_context.tenant_id.clone();
	let session_manager: Arc<LocalSessionManager> = Default::default();
	let service = StreamableHttpService::new(
		move || Ok(SiftMcp::new(api_base.clone(), tenant_id.clone())),
		session_manager,
		StreamableHttpServerConfig::default(),
	);
	let router = Router::new().fallback_service(service);
	let listener = TcpListener::bind(bind_addr).await?;

	axum::serve(listener, router).await?;

	Ok(())
}

fn hybrid_search_path(knowledge_base_id: &str) -> Result<String, ErrorData> {
	// Dot segments survive encoding and would be resolved away by the URL parser.
	if matches!(knowledge_base_id, "." | "..") {
		return Err(ErrorData::invalid_params("knowledge_base_id must not be a dot segment.", None));
	}

	Ok(format!("/v1/knowledge-bases/{}/hybrid-search", urlencoding::encode(knowledge_base_id)))
}

fn normalize_api_base(raw: &str) -> String {
	let trimmed = raw.trim().trim_end_matches('/');
	let (scheme, rest) = if let Some(value) = trimmed.strip_prefix("http://") {
		("http://", value)
	} else if let Some(value) = trimmed.strip_prefix("https://") {
		("https://", value)
	} else {
		("http://", trimmed)
	};
	// The API shares this host; wildcard binds are reached over loopback.
	let rest = if let Some(value) = rest.strip_prefix("0.0.0.0:") {
		format!("127.0.0.1:{value}")
	} else if let Some(value) = rest.strip_prefix("[::]:") {
		format!("127.0.0.1:{value}")
	} else {
		rest.to_string()
	};

	format!("{scheme}{rest}")
}

fn take_required_string(params: &mut JsonObject, key: &str) -> Result<String, ErrorData> {
	let value = params
		.remove(key)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} is required."), None))?;
	let text = value
		.as_str()
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be a string."), None))?
		.trim();

	if text.is_empty() {
		return Err(ErrorData::invalid_params(format!("{key} must be non-empty."), None));
	}

	Ok(text.to_string())
}

fn hybrid_search_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["knowledge_base_id", "query_text"],
		"properties": {
			"knowledge_base_id": { "type": "string" },
			"query_text": { "type": "string" },
			"match_count": { "type": "integer", "minimum": 1 },
			"vector_threshold": { "type": "number" },
			"keyword_threshold": { "type": "number" },
			"disable_keywords_match": { "type": "boolean" },
			"disable_vector_match": { "type": "boolean" },
			"knowledge_ids": { "type": "array", "items": { "type": "string" } },
			"tag_ids": { "type": "array", "items": { "type": "string" } }
		}
	}))
}

fn database_query_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["sql"],
		"properties": {
			"sql": { "type": "string" }
		}
	}))
}

async fn handle_response(response: reqwest::Response) -> Result<CallToolResult, ErrorData> {
	let status = response.status();
	let bytes = response
		.bytes()
		.await
		.map_err(|err| ErrorData::internal_error(format!("Sift API response error: {err}"), None))?;
	let parsed = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
		let raw = String::from_utf8_lossy(&bytes).to_string();

		serde_json::json!({ "raw": raw })
	});

	if status.is_success() {
		Ok(CallToolResult::structured(parsed))
	} else {
		Ok(CallToolResult::structured_error(parsed))
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn wildcard_api_base_is_reached_over_loopback() {
		assert_eq!(normalize_api_base("0.0.0.0:8080"), "http://127.0.0.1:8080");
		assert_eq!(normalize_api_base("[::]:8080"), "http://127.0.0.1:8080");
		assert_eq!(normalize_api_base("https://sift.local/"), "https://sift.local");
	}

	#[test]
	fn knowledge_base_id_moves_into_the_path() {
		let mut params = JsonObject::new();

		params.insert("knowledge_base_id".to_string(), json!(" kb-1 "));
		params.insert("query_text".to_string(), json!("refunds"));

		let knowledge_base_id =
			take_required_string(&mut params, "knowledge_base_id").expect("expected an ID");

		assert_eq!(
			hybrid_search_path(&knowledge_base_id).expect("expected a path"),
			"/v1/knowledge-bases/kb-1/hybrid-search"
		);
		assert!(!params.contains_key("knowledge_base_id"));
		assert!(params.contains_key("query_text"));
	}

	#[test]
	fn knowledge_base_id_is_a_single_encoded_segment() {
		assert_eq!(
			hybrid_search_path("a/../../v1/tools/database_query?x=#").expect("expected a path"),
			"/v1/knowledge-bases/a%2F..%2F..%2Fv1%2Ftools%2Fdatabase_query%3Fx%3D%23/hybrid-search"
		);
		assert!(hybrid_search_path("..").is_err());
		assert!(hybrid_search_path(".").is_err());
	}

	#[test]
	fn blank_or_mistyped_ids_are_invalid_params() {
		let mut params = JsonObject::new();

		params.insert("knowledge_base_id".to_string(), json!("  "));

		assert!(take_required_string(&mut params, "knowledge_base_id").is_err());

		params.insert("knowledge_base_id".to_string(), json!(7));

		assert!(take_required_string(&mut params, "knowledge_base_id").is_err());
		assert!(take_required_string(&mut params, "knowledge_base_id").is_err());
	}

	#[test]
	fn schemas_require_their_arguments() {
		assert_eq!(hybrid_search_schema()["required"], json!(["knowledge_base_id", "query_text"]));
		assert_eq!(database_query_schema()["required"], json!(["sql"]));
	}
}

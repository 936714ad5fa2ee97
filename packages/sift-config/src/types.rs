use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub sql: Sql,
	#[serde(default)]
	pub security: Security,
	pub mcp: Option<McpContext>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct McpContext {
	pub tenant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub mcp_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub elasticsearch: Elasticsearch,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Elasticsearch {
	pub url: String,
	pub index: String,
	pub username: Option<String>,
	pub password: Option<String>,
	pub api_key: Option<String>,
	#[serde(default = "default_elasticsearch_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Providers {
	/// Optional. Without it every search runs keyword-only.
	pub embedding: Option<EmbeddingProviderConfig>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_match_count: u32,
	pub max_match_count: u32,
	pub vector_threshold: f64,
	pub keyword_threshold: f64,
	pub content_field: String,
	pub vector_field: String,
	pub knowledge_base_field: String,
	pub knowledge_field: String,
	pub tag_field: String,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_match_count: 10,
			max_match_count: 100,
			vector_threshold: 0.7,
			keyword_threshold: 0.1,
			content_field: "content".to_string(),
			vector_field: "embedding".to_string(),
			knowledge_base_field: "knowledge_base_id".to_string(),
			knowledge_field: "knowledge_id".to_string(),
			tag_field: "tag_id".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sql {
	/// Result sets above this size still render in full, with a LIMIT hint appended.
	pub max_display_rows: u32,
	pub statement_timeout_ms: u64,
}
impl Default for Sql {
	fn default() -> Self {
		Self { max_display_rows: 10, statement_timeout_ms: 5_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Security {
	pub bind_localhost_only: bool,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true }
	}
}

fn default_elasticsearch_timeout_ms() -> u64 {
	10_000
}

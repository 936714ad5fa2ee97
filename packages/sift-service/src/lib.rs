pub mod search;
pub mod sql;
pub mod tool;

mod error;

pub use error::{Error, Result};
pub use search::{
	ChunkType, Degradation, DegradationKind, HybridSearchParams, HybridSearchResponse,
	HybridSearchResult, MatchType,
};
pub use sql::{
	SqlValidator, ValidatedQuery, ValidationError,
	policy::{DEFAULT_POLICY, SqlPolicy, TableRule},
	tool::{DatabaseQueryResponse, SqlQueryTool},
};
pub use tool::{HybridSearchTool, ToolDefinition, ToolOutput};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use sift_config::{Config, EmbeddingProviderConfig};
use sift_providers::embedding;
use sift_storage::{
	db::Db,
	elasticsearch::{ElasticsearchStore, RawSearchResponse},
	models::{KnowledgeBase, KnowledgeMeta},
	queries,
	rows::{self, QueryRows},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// The search engine as the hybrid executor sees it.
pub trait SearchEngine
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		index: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<RawSearchResponse>>;
}

/// Knowledge-base and document metadata lookups, always within one tenant.
pub trait KnowledgeCatalog
where
	Self: Send + Sync,
{
	fn get_knowledge_base<'a>(
		&'a self,
		tenant_id: &'a str,
		knowledge_base_id: &'a str,
	) -> BoxFuture<'a, Result<Option<KnowledgeBase>>>;

	fn list_knowledge_meta<'a>(
		&'a self,
		tenant_id: &'a str,
		knowledge_ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<KnowledgeMeta>>>;
}

/// Runs one already-validated query string.
pub trait SqlExecutor
where
	Self: Send + Sync,
{
	fn query<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<QueryRows>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub catalog: Arc<dyn KnowledgeCatalog>,
	pub engine: Arc<dyn SearchEngine>,
	pub sql: Arc<dyn SqlExecutor>,
	pub providers: Providers,
}
impl SiftService {
	pub fn new(cfg: Config, db: Db, engine: ElasticsearchStore) -> Self {
		let sql =
			ReadOnlyExecutor { db: db.clone(), statement_timeout_ms: cfg.sql.statement_timeout_ms };

		Self::with_parts(cfg, Arc::new(db), Arc::new(engine), Arc::new(sql), Providers::default())
	}

	pub fn with_parts(
		cfg: Config,
		catalog: Arc<dyn KnowledgeCatalog>,
		engine: Arc<dyn SearchEngine>,
		sql: Arc<dyn SqlExecutor>,
		providers: Providers,
	) -> Self {
		Self { cfg, catalog, engine, sql, providers }
	}
}

/// Postgres execution inside a read-only transaction with a statement timeout.
pub struct ReadOnlyExecutor {
	pub db: Db,
	pub statement_timeout_ms: u64,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

impl SearchEngine for ElasticsearchStore {
	fn search<'a>(
		&'a self,
		index: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<RawSearchResponse>> {
		Box::pin(async move {
			ElasticsearchStore::search(self, index, body)
				.await
				.map_err(|err| Error::SearchEngine { message: err.to_string() })
		})
	}
}

impl KnowledgeCatalog for Db {
	fn get_knowledge_base<'a>(
		&'a self,
		tenant_id: &'a str,
		knowledge_base_id: &'a str,
	) -> BoxFuture<'a, Result<Option<KnowledgeBase>>> {
		Box::pin(async move {
			Ok(queries::get_knowledge_base(self, tenant_id, knowledge_base_id).await?)
		})
	}

	fn list_knowledge_meta<'a>(
		&'a self,
		tenant_id: &'a str,
		knowledge_ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<KnowledgeMeta>>> {
		Box::pin(
			async move { Ok(queries::list_knowledge_meta(self, tenant_id, knowledge_ids).await?) },
		)
	}
}

impl SqlExecutor for ReadOnlyExecutor {
	fn query<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<QueryRows>> {
		Box::pin(async move {
			Ok(rows::fetch_read_only(&self.db, sql, self.statement_timeout_ms).await?)
		})
	}
}

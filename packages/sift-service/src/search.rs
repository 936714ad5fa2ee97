pub mod enrich;
pub mod hits;
pub mod query;

pub use enrich::ResultEnricher;
pub use hits::HybridSearchExecutor;
pub use query::EsQueryBuilder;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result, SiftService};

/// Caller-supplied search parameters. Non-positive numbers mean "use the default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSearchParams {
	pub query_text: String,
	pub vector_threshold: f64,
	pub keyword_threshold: f64,
	pub match_count: i64,
	pub disable_keywords_match: bool,
	pub disable_vector_match: bool,
	/// Restricts the search to these documents.
	pub knowledge_ids: Vec<String>,
	pub tag_ids: Vec<String>,
}
impl HybridSearchParams {
	/// Fills defaults from `cfg` and clamps the match count to `cfg.max_match_count`.
	pub fn with_defaults(mut self, cfg: &sift_config::Search) -> Self {
		self.query_text = self.query_text.trim().to_string();

		if self.match_count <= 0 {
			self.match_count = i64::from(cfg.default_match_count);
		}

		self.match_count = self.match_count.min(i64::from(cfg.max_match_count));

		if self.vector_threshold <= 0.0 {
			self.vector_threshold = cfg.vector_threshold;
		}
		if self.keyword_threshold <= 0.0 {
			self.keyword_threshold = cfg.keyword_threshold;
		}

		self
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
	#[default]
	Text,
	Image,
	Table,
}
impl ChunkType {
	pub fn parse(raw: &str) -> Self {
		match raw {
			"image" => Self::Image,
			"table" => Self::Table,
			_ => Self::Text,
		}
	}
}

/// Which matcher produced a hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
	#[default]
	Keyword,
	Vector,
	Hybrid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchResult {
	pub id: String,
	pub content: String,
	pub knowledge_id: String,
	pub chunk_index: i64,
	pub knowledge_title: String,
	pub start_at: i64,
	pub end_at: i64,
	pub seq: i64,
	pub chunk_type: ChunkType,
	pub image_info: Option<String>,
	/// Engine-native score. Vector hits are shifted by +1.0.
	pub score: f64,
	pub match_type: MatchType,
	pub knowledge_filename: String,
	pub knowledge_source: String,
	pub knowledge_file_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
	EmbeddingUnavailable,
	EmbeddingFailed,
	EnrichmentFailed,
}

/// A step that was skipped without failing the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
	pub kind: DegradationKind,
	pub message: String,
}
impl Degradation {
	fn new(kind: DegradationKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into() }
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchResponse {
	pub results: Vec<HybridSearchResult>,
	pub degraded: Vec<Degradation>,
}

impl SiftService {
	pub async fn hybrid_search(
		&self,
		tenant_id: &str,
		knowledge_base_id: &str,
		params: HybridSearchParams,
	) -> Result<HybridSearchResponse> {
		if tenant_id.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "tenant_id is required.".to_string() });
		}
		if params.query_text.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "query_text must be non-empty.".to_string(),
			});
		}
		if params.disable_keywords_match && params.disable_vector_match {
			return Err(Error::InvalidRequest {
				message: "At least one of keyword or vector matching must be enabled.".to_string(),
			});
		}

		let params = params.with_defaults(&self.cfg.search);

		if self.catalog.get_knowledge_base(tenant_id, knowledge_base_id).await?.is_none() {
			return Err(Error::NotFound {
				message: format!("Knowledge base {knowledge_base_id} was not found."),
			});
		}

		let mut degraded = Vec::new();
		let query_vector = if params.disable_vector_match {
			None
		} else {
			self.embed_query(&params.query_text, &mut degraded).await
		};

		if query_vector.is_none() && params.disable_keywords_match {
			warn!(
				knowledge_base_id,
				"Vector-only search has no query vector. Returning no results."
			);

			return Ok(HybridSearchResponse { results: Vec::new(), degraded });
		}

		let body = EsQueryBuilder::new(&self.cfg.search).build(
			knowledge_base_id,
			&params,
			query_vector.as_deref(),
		);
		let executor =
			HybridSearchExecutor::new(self.engine.as_ref(), &self.cfg.storage.elasticsearch.index);
		let mut results = executor.execute(&body, &params, query_vector.is_some()).await?;

		if let Err(err) =
			ResultEnricher::new(self.catalog.as_ref()).enrich(tenant_id, &mut results).await
		{
			warn!(
				knowledge_base_id,
				error = %err,
				"Result enrichment failed. Returning bare results."
			);

			degraded.push(Degradation::new(DegradationKind::EnrichmentFailed, err.to_string()));
		}

		info!(
			knowledge_base_id,
			results = results.len(),
			vector = query_vector.is_some(),
			keyword = !params.disable_keywords_match,
			degraded = degraded.len(),
			"Hybrid search completed."
		);

		Ok(HybridSearchResponse { results, degraded })
	}

	async fn embed_query(&self, text: &str, degraded: &mut Vec<Degradation>) -> Option<Vec<f32>> {
		let Some(cfg) = self.cfg.providers.embedding.as_ref() else {
			warn!("No embedding provider is configured. Skipping vector matching.");

			degraded.push(Degradation::new(
				DegradationKind::EmbeddingUnavailable,
				"No embedding provider is configured.",
			));

			return None;
		};
		let texts = vec![text.to_string()];

		match self.providers.embedding.embed(cfg, &texts).await {
			Ok(mut vectors) => match vectors.pop() {
				Some(vector) if !vector.is_empty() => Some(vector),
				_ => {
					warn!(provider_id = %cfg.provider_id, "Embedding provider returned no vector.");

					degraded.push(Degradation::new(
						DegradationKind::EmbeddingFailed,
						"Embedding provider returned no vector.",
					));

					None
				},
			},
			Err(err) => {
				warn!(
					provider_id = %cfg.provider_id,
					error = %err,
					"Query embedding failed. Skipping vector matching."
				);

				degraded.push(Degradation::new(DegradationKind::EmbeddingFailed, err.to_string()));

				None
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_fill_non_positive_values() {
		let params = HybridSearchParams {
			query_text: "  refund policy ".to_string(),
			match_count: -3,
			..Default::default()
		}
		.with_defaults(&sift_config::Search::default());

		assert_eq!(params.query_text, "refund policy");
		assert_eq!(params.match_count, 10);
		assert!((params.vector_threshold - 0.7).abs() < f64::EPSILON);
		assert!((params.keyword_threshold - 0.1).abs() < f64::EPSILON);
	}

	#[test]
	fn match_count_is_clamped() {
		let params = HybridSearchParams { match_count: 5_000, ..Default::default() }
			.with_defaults(&sift_config::Search::default());

		assert_eq!(params.match_count, 100);
	}

	#[test]
	fn explicit_values_are_kept() {
		let params = HybridSearchParams {
			match_count: 3,
			vector_threshold: 0.5,
			keyword_threshold: 2.0,
			..Default::default()
		}
		.with_defaults(&sift_config::Search::default());

		assert_eq!(params.match_count, 3);
		assert!((params.vector_threshold - 0.5).abs() < f64::EPSILON);
		assert!((params.keyword_threshold - 2.0).abs() < f64::EPSILON);
	}

	#[test]
	fn unknown_chunk_types_read_as_text() {
		assert_eq!(ChunkType::parse("image"), ChunkType::Image);
		assert_eq!(ChunkType::parse("table"), ChunkType::Table);
		assert_eq!(ChunkType::parse("video"), ChunkType::Text);
	}
}

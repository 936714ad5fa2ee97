use serde_json::{Value, json};

use crate::search::HybridSearchParams;

/// Query name attached to the keyword clause, echoed back in `matched_queries`.
pub const KEYWORD_QUERY_NAME: &str = "keyword";
/// Query name attached to the vector clause, echoed back in `matched_queries`.
pub const VECTOR_QUERY_NAME: &str = "vector";
/// `script_score` adds this to cosine similarity so scores stay non-negative.
pub const VECTOR_SCORE_OFFSET: f64 = 1.0;

/// Builds the Elasticsearch bool query for one hybrid search.
pub struct EsQueryBuilder<'a> {
	fields: &'a sift_config::Search,
}
impl<'a> EsQueryBuilder<'a> {
	pub fn new(fields: &'a sift_config::Search) -> Self {
		Self { fields }
	}

	/// `params` must already carry defaults; see [`HybridSearchParams::with_defaults`].
	pub fn build(
		&self,
		knowledge_base_id: &str,
		params: &HybridSearchParams,
		query_vector: Option<&[f32]>,
	) -> Value {
		let mut should = Vec::new();
		let mut min_score = params.keyword_threshold;

		if !params.disable_keywords_match {
			should.push(self.keyword_clause(&params.query_text));
		}
		if !params.disable_vector_match
			&& let Some(vector) = query_vector
		{
			let vector_floor = params.vector_threshold + VECTOR_SCORE_OFFSET;

			// The top-level floor applies to every hit and must not cut vector hits.
			min_score = min_score.min(vector_floor);

			should.push(self.vector_clause(vector, vector_floor));
		}

		let mut must =
			vec![json!({ "term": { &self.fields.knowledge_base_field: knowledge_base_id } })];

		if !params.knowledge_ids.is_empty() {
			must.push(json!({ "terms": { &self.fields.knowledge_field: params.knowledge_ids } }));
		}
		if !params.tag_ids.is_empty() {
			must.push(json!({ "terms": { &self.fields.tag_field: params.tag_ids } }));
		}

		let mut bool_query = json!({ "must": must });

		if !should.is_empty() {
			bool_query["should"] = Value::Array(should);
			bool_query["minimum_should_match"] = json!(1);
		}

		json!({
			"size": params.match_count.max(0),
			"min_score": min_score,
			"query": { "bool": bool_query },
		})
	}

	fn keyword_clause(&self, query_text: &str) -> Value {
		json!({
			"match": {
				&self.fields.content_field: {
					"query": query_text,
					"_name": KEYWORD_QUERY_NAME,
				}
			}
		})
	}

	fn vector_clause(&self, vector: &[f32], vector_floor: f64) -> Value {
		let source =
			format!("cosineSimilarity(params.query_vector, '{}') + 1.0", self.fields.vector_field);

		json!({
			"script_score": {
				"query": { "match_all": {} },
				"script": {
					"source": source,
					"params": { "query_vector": vector },
				},
				"min_score": vector_floor,
				"_name": VECTOR_QUERY_NAME,
			}
		})
	}
}

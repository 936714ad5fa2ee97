use serde_json::Value;

use crate::{
	Error, Result, SearchEngine,
	search::{
		ChunkType, HybridSearchParams, HybridSearchResult, MatchType,
		query::{KEYWORD_QUERY_NAME, VECTOR_QUERY_NAME, VECTOR_SCORE_OFFSET},
	},
};

/// Runs a built query against one index and decodes the hits in engine order.
pub struct HybridSearchExecutor<'a> {
	engine: &'a dyn SearchEngine,
	index: &'a str,
}
impl<'a> HybridSearchExecutor<'a> {
	pub fn new(engine: &'a dyn SearchEngine, index: &'a str) -> Self {
		Self { engine, index }
	}

	pub async fn execute(
		&self,
		body: &Value,
		params: &HybridSearchParams,
		vector_enabled: bool,
	) -> Result<Vec<HybridSearchResult>> {
		let response = self.engine.search(self.index, body).await?;

		if response.is_error {
			return Err(Error::SearchEngine {
				message: format!(
					"Search on index {} failed with status {}: {}",
					self.index, response.status, response.raw
				),
			});
		}

		let vector_floor = params.vector_threshold + VECTOR_SCORE_OFFSET;
		let results = decode_hits(&response.body)
			.into_iter()
			.map(|(mut result, matched)| {
				result.match_type = classify(&matched, result.score, vector_enabled, vector_floor);

				result
			})
			.collect();

		Ok(results)
	}
}

/// Decodes `hits.hits[]`. Missing or mistyped fields are left at their zero values.
pub fn decode_hits(body: &Value) -> Vec<(HybridSearchResult, Vec<String>)> {
	let Some(hits) = body.pointer("/hits/hits").and_then(Value::as_array) else {
		return Vec::new();
	};

	hits.iter().map(decode_hit).collect()
}

fn decode_hit(hit: &Value) -> (HybridSearchResult, Vec<String>) {
	let source = hit.get("_source");
	let result = HybridSearchResult {
		id: string_field(Some(hit), "_id"),
		content: string_field(source, "content"),
		knowledge_id: string_field(source, "knowledge_id"),
		chunk_index: int_field(source, "chunk_index"),
		knowledge_title: string_field(source, "knowledge_title"),
		start_at: int_field(source, "start_at"),
		end_at: int_field(source, "end_at"),
		seq: int_field(source, "seq"),
		chunk_type: ChunkType::parse(&string_field(source, "chunk_type")),
		image_info: source
			.and_then(|source| source.get("image_info"))
			.and_then(Value::as_str)
			.map(str::to_string),
		score: hit.get("_score").and_then(Value::as_f64).unwrap_or_default(),
		..Default::default()
	};
	let matched = hit
		.get("matched_queries")
		.and_then(Value::as_array)
		.map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
		.unwrap_or_default();

	(result, matched)
}

fn string_field(value: Option<&Value>, key: &str) -> String {
	value.and_then(|value| value.get(key)).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn int_field(value: Option<&Value>, key: &str) -> i64 {
	value.and_then(|value| value.get(key)).and_then(Value::as_i64).unwrap_or_default()
}

// Named queries are authoritative; the score band is the fallback when the engine omits them.
fn classify(matched: &[String], score: f64, vector_enabled: bool, vector_floor: f64) -> MatchType {
	let keyword = matched.iter().any(|name| name == KEYWORD_QUERY_NAME);
	let vector = matched.iter().any(|name| name == VECTOR_QUERY_NAME);

	match (keyword, vector) {
		(true, true) => MatchType::Hybrid,
		(false, true) => MatchType::Vector,
		(true, false) => MatchType::Keyword,
		(false, false) if vector_enabled && score >= vector_floor => MatchType::Vector,
		(false, false) => MatchType::Keyword,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn decodes_hits_in_engine_order() {
		let body = json!({
			"hits": { "hits": [
				{
					"_id": "chunk-2",
					"_score": 1.92,
					"_source": {
						"content": "Refunds take 5 days.",
						"knowledge_id": "doc-1",
						"chunk_index": 3,
						"knowledge_title": "Policies",
						"start_at": 120,
						"end_at": 180,
						"seq": 4,
						"chunk_type": "table",
						"image_info": "{\"url\":\"a.png\"}"
					}
				},
				{ "_id": "chunk-1", "_score": 0.4, "_source": { "content": "Other" } }
			] }
		});
		let hits = decode_hits(&body);

		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].0.id, "chunk-2");
		assert_eq!(hits[0].0.chunk_index, 3);
		assert_eq!(hits[0].0.chunk_type, ChunkType::Table);
		assert_eq!(hits[0].0.image_info.as_deref(), Some("{\"url\":\"a.png\"}"));
		assert_eq!(hits[1].0.id, "chunk-1");
	}

	#[test]
	fn tolerates_missing_and_mistyped_fields() {
		let body = json!({
			"hits": { "hits": [
				{ "_id": 7, "_score": null, "_source": { "chunk_index": "three", "seq": 2.5 } },
				{}
			] }
		});
		let hits = decode_hits(&body);

		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].0, HybridSearchResult::default());
		assert_eq!(hits[1].0, HybridSearchResult::default());
	}

	#[test]
	fn missing_hits_decode_to_nothing() {
		assert!(decode_hits(&json!({ "took": 3 })).is_empty());
		assert!(decode_hits(&Value::Null).is_empty());
	}

	#[test]
	fn named_queries_decide_match_type() {
		let both = vec!["keyword".to_string(), "vector".to_string()];
		let vector = vec!["vector".to_string()];
		let keyword = vec!["keyword".to_string()];

		assert_eq!(classify(&both, 2.4, true, 1.7), MatchType::Hybrid);
		assert_eq!(classify(&vector, 1.8, true, 1.7), MatchType::Vector);
		assert_eq!(classify(&keyword, 9.0, true, 1.7), MatchType::Keyword);
	}

	#[test]
	fn score_band_is_the_fallback() {
		assert_eq!(classify(&[], 1.75, true, 1.7), MatchType::Vector);
		assert_eq!(classify(&[], 1.75, false, 1.7), MatchType::Keyword);
		assert_eq!(classify(&[], 0.9, true, 1.7), MatchType::Keyword);
	}
}

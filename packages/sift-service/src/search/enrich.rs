use std::collections::{HashMap, HashSet};

use crate::{KnowledgeCatalog, Result, search::HybridSearchResult};

/// Back-fills document metadata onto search results with one batched lookup.
pub struct ResultEnricher<'a> {
	catalog: &'a dyn KnowledgeCatalog,
}
impl<'a> ResultEnricher<'a> {
	pub fn new(catalog: &'a dyn KnowledgeCatalog) -> Self {
		Self { catalog }
	}

	/// Results whose document is missing keep blank metadata.
	pub async fn enrich(&self, tenant_id: &str, results: &mut [HybridSearchResult]) -> Result<()> {
		let knowledge_ids = distinct_knowledge_ids(results);

		if knowledge_ids.is_empty() {
			return Ok(());
		}

		let metas = self.catalog.list_knowledge_meta(tenant_id, &knowledge_ids).await?;
		let by_id: HashMap<&str, _> = metas.iter().map(|meta| (meta.id.as_str(), meta)).collect();

		for result in results.iter_mut() {
			let Some(meta) = by_id.get(result.knowledge_id.as_str()) else {
				continue;
			};

			result.knowledge_title =
				if meta.title.is_empty() { meta.file_name.clone() } else { meta.title.clone() };
			result.knowledge_filename = meta.file_name.clone();
			result.knowledge_source = meta.source.clone();
			result.knowledge_file_type = meta.file_type.clone();
		}

		Ok(())
	}
}

fn distinct_knowledge_ids(results: &[HybridSearchResult]) -> Vec<String> {
	let mut seen = HashSet::new();

	results
		.iter()
		.filter(|result| !result.knowledge_id.is_empty())
		.filter(|result| seen.insert(result.knowledge_id.as_str()))
		.map(|result| result.knowledge_id.clone())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn result(knowledge_id: &str) -> HybridSearchResult {
		HybridSearchResult { knowledge_id: knowledge_id.to_string(), ..Default::default() }
	}

	#[test]
	fn distinct_ids_keep_first_seen_order() {
		let results = vec![result("b"), result("a"), result("b"), result(""), result("c")];

		assert_eq!(distinct_knowledge_ids(&results), vec!["b", "a", "c"]);
	}
}

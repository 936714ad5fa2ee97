use crate::{
	Result,
	db::Db,
	models::{KnowledgeBase, KnowledgeMeta},
};

pub async fn get_knowledge_base(
	db: &Db,
	tenant_id: &str,
	knowledge_base_id: &str,
) -> Result<Option<KnowledgeBase>> {
	let row = sqlx::query_as::<_, KnowledgeBase>(
		"\
SELECT
	id,
	tenant_id,
	name,
	description,
	embedding_model_id,
	created_at,
	updated_at
FROM knowledge_bases
WHERE tenant_id = $1 AND id = $2",
	)
	.bind(tenant_id)
	.bind(knowledge_base_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Fetches metadata for every listed knowledge in one round trip. Unknown IDs are skipped.
pub async fn list_knowledge_meta(
	db: &Db,
	tenant_id: &str,
	knowledge_ids: &[String],
) -> Result<Vec<KnowledgeMeta>> {
	if knowledge_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, KnowledgeMeta>(
		"\
SELECT
	id,
	title,
	file_name,
	file_type,
	source
FROM knowledges
WHERE tenant_id = $1 AND id = ANY($2)",
	)
	.bind(tenant_id)
	.bind(knowledge_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

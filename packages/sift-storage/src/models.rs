use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KnowledgeBase {
	pub id: String,
	pub tenant_id: String,
	pub name: String,
	pub description: String,
	pub embedding_model_id: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// The slice of a `knowledges` row that search results are enriched with.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct KnowledgeMeta {
	pub id: String,
	pub title: String,
	pub file_name: String,
	pub file_type: String,
	pub source: String,
}

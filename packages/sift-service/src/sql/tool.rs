use serde::Serialize;
use serde_json::json;

use sift_storage::rows::{CellValue, QueryRows};

use crate::{Error, Result, SiftService, SqlExecutor, sql::SqlValidator, tool::ToolDefinition};

const NULL_MARKER: &str = "<NULL>";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseQueryResponse {
	/// The statement as executed, tenant predicates included.
	pub executed_sql: String,
	pub row_count: usize,
	pub columns: Vec<String>,
	pub rows: Vec<Vec<CellValue>>,
	/// The rendering handed back to the agent.
	pub output: String,
}

/// Agent-facing wrapper that validates, executes, and renders one SQL query.
pub struct SqlQueryTool<'a> {
	executor: &'a dyn SqlExecutor,
	validator: SqlValidator,
	max_display_rows: usize,
}
impl<'a> SqlQueryTool<'a> {
	pub const NAME: &'static str = "database_query";

	pub fn new(
		executor: &'a dyn SqlExecutor,
		validator: SqlValidator,
		max_display_rows: usize,
	) -> Self {
		Self { executor, validator, max_display_rows }
	}

	pub fn definition() -> ToolDefinition {
		ToolDefinition {
			name: Self::NAME.to_string(),
			description: "Run one read-only SELECT against the knowledge base tables \
				(knowledge_bases, knowledges, chunks, sessions, messages, agents, tools, faqs, \
				models, users). Results are scoped to the current tenant. Subqueries, CTEs and \
				set operations are rejected; add a LIMIT for large result sets."
				.to_string(),
			parameters: json!({
				"type": "object",
				"properties": {
					"sql": {
						"type": "string",
						"description": "A single PostgreSQL SELECT statement."
					}
				},
				"required": ["sql"]
			}),
		}
	}

	/// Nothing reaches the executor unless validation passes.
	pub async fn run(&self, sql: &str) -> Result<DatabaseQueryResponse> {
		let validated = self.validator.validate(sql)?;

		tracing::debug!(tables = ?validated.tables, "SQL query validated.");

		let QueryRows { columns, rows } = self.executor.query(&validated.sql).await?;
		let output = render_rows(&validated.sql, &columns, &rows, self.max_display_rows);

		Ok(DatabaseQueryResponse {
			executed_sql: validated.sql,
			row_count: rows.len(),
			columns,
			rows,
			output,
		})
	}
}

impl SiftService {
	pub async fn database_query(
		&self,
		tenant_id: &str,
		sql: &str,
	) -> Result<DatabaseQueryResponse> {
		if tenant_id.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "tenant_id is required.".to_string() });
		}

		let validator = SqlValidator::new(&crate::DEFAULT_POLICY, tenant_id);
		let max_display_rows = self.cfg.sql.max_display_rows as usize;
		let response =
			SqlQueryTool::new(self.sql.as_ref(), validator, max_display_rows).run(sql).await;

		match &response {
			Ok(response) => tracing::info!(rows = response.row_count, "Database query completed."),
			Err(Error::SqlValidation(err)) =>
				tracing::warn!(reason = %err, "Database query rejected."),
			Err(err) => tracing::warn!(error = %err, "Database query failed."),
		}

		response
	}
}

pub fn render_rows(
	sql: &str,
	columns: &[String],
	rows: &[Vec<CellValue>],
	max_display_rows: usize,
) -> String {
	let mut out = format!("Executed SQL: {sql}\nRows returned: {}\n", rows.len());

	for (index, row) in rows.iter().enumerate() {
		out.push_str(&format!("\nRecord {}:\n", index + 1));

		for (column, cell) in columns.iter().zip(row) {
			out.push_str(&format!("  {column}: {}\n", render_cell(cell)));
		}
	}

	if rows.len() > max_display_rows {
		out.push_str(&format!(
			"\nNote: {} rows were returned. Add a LIMIT clause to keep results focused.\n",
			rows.len()
		));
	}

	out
}

fn render_cell(cell: &CellValue) -> String {
	match cell {
		CellValue::Null => NULL_MARKER.to_string(),
		CellValue::Text(value) | CellValue::Binary(value) => value.clone(),
		CellValue::Integer(value) => value.to_string(),
		CellValue::Float(value) => value.to_string(),
		CellValue::Bool(value) => value.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_records_in_column_order() {
		let columns = vec!["id".to_string(), "name".to_string(), "score".to_string()];
		let rows = vec![vec![
			CellValue::Integer(1),
			CellValue::Null,
			CellValue::Float(0.5),
		]];

		assert_eq!(
			render_rows("SELECT id, name, score FROM faqs", &columns, &rows, 10),
			"Executed SQL: SELECT id, name, score FROM faqs\nRows returned: 1\n\nRecord 1:\n  id: 1\n  name: <NULL>\n  score: 0.5\n"
		);
	}

	#[test]
	fn hints_at_limit_but_renders_every_row() {
		let columns = vec!["id".to_string()];
		let rows: Vec<_> = (0..12).map(|id| vec![CellValue::Integer(id)]).collect();
		let out = render_rows("SELECT id FROM users", &columns, &rows, 10);

		assert!(out.contains("Rows returned: 12"));
		assert!(out.contains("Record 12:\n  id: 11"));
		assert!(out.contains("Add a LIMIT clause"));
	}

	#[test]
	fn no_hint_at_the_threshold() {
		let columns = vec!["id".to_string()];
		let rows: Vec<_> = (0..10).map(|id| vec![CellValue::Integer(id)]).collect();

		assert!(!render_rows("SELECT id FROM users", &columns, &rows, 10).contains("LIMIT"));
	}

	#[test]
	fn binary_and_bool_cells_render_as_text() {
		assert_eq!(render_cell(&CellValue::Binary("hello".to_string())), "hello");
		assert_eq!(render_cell(&CellValue::Bool(false)), "false");
	}
}

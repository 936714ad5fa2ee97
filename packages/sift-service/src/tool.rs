use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
	Error, Result, SiftService,
	search::{HybridSearchParams, HybridSearchResponse},
	sql::tool::SqlQueryTool,
};

/// An agent-callable capability: name, purpose, and JSON schema for its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
	pub name: String,
	pub description: String,
	pub parameters: Value,
}
impl ToolDefinition {
	/// Checks that every `required` argument is present.
	pub fn validate_args(&self, args: &Value) -> Result<()> {
		let Some(required) = self.parameters.get("required").and_then(Value::as_array) else {
			return Ok(());
		};

		for key in required.iter().filter_map(Value::as_str) {
			if args.get(key).is_none_or(Value::is_null) {
				return Err(Error::InvalidRequest {
					message: format!("Missing required argument: {key}."),
				});
			}
		}

		Ok(())
	}
}

/// Output of a tool call: the agent-facing text plus the structured payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
	pub name: String,
	pub output: String,
	pub data: Value,
}

pub fn definitions() -> Vec<ToolDefinition> {
	vec![SqlQueryTool::definition(), HybridSearchTool::definition()]
}

/// The hybrid search exposed as an agent tool.
pub struct HybridSearchTool;
impl HybridSearchTool {
	pub const NAME: &'static str = "hybrid_search";

	pub fn definition() -> ToolDefinition {
		ToolDefinition {
			name: Self::NAME.to_string(),
			description: "Search one knowledge base with combined keyword and vector matching. \
				Returns the best matching chunks with their document titles."
				.to_string(),
			parameters: json!({
				"type": "object",
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
				},
				"required": ["knowledge_base_id", "query_text"]
			}),
		}
	}

	/// Splits tool arguments into the knowledge base ID and the search parameters.
	pub fn parse_args(args: &Value) -> Result<(String, HybridSearchParams)> {
		let knowledge_base_id = args
			.get("knowledge_base_id")
			.and_then(Value::as_str)
			.map(str::trim)
			.filter(|id| !id.is_empty())
			.ok_or_else(|| Error::InvalidRequest {
				message: "knowledge_base_id must be a non-empty string.".to_string(),
			})?
			.to_string();
		let params = serde_json::from_value::<HybridSearchParams>(args.clone()).map_err(|err| {
			Error::InvalidRequest { message: format!("Invalid hybrid search arguments: {err}.") }
		})?;

		Ok((knowledge_base_id, params))
	}

	pub fn render(response: &HybridSearchResponse) -> String {
		let mut out = String::new();

		if response.results.is_empty() {
			out.push_str("No matching content found.\n");
		}

		for (index, result) in response.results.iter().enumerate() {
			out.push_str(&format!(
				"[{}] {} (score {:.3}, {:?})\n",
				index + 1,
				result.knowledge_title,
				result.score,
				result.match_type
			));

			if !result.knowledge_filename.is_empty() {
				out.push_str(&format!("Source: {}\n", result.knowledge_filename));
			}

			out.push_str(&format!("{}\n\n", result.content));
		}

		for degradation in &response.degraded {
			out.push_str(&format!("Note: {}\n", degradation.message));
		}

		out
	}
}

impl SiftService {
	pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
		definitions()
	}

	/// Dispatches one tool call by name.
	pub async fn call_tool(&self, tenant_id: &str, name: &str, args: &Value) -> Result<ToolOutput> {
		let definition = definitions()
			.into_iter()
			.find(|definition| definition.name == name)
			.ok_or_else(|| Error::NotFound { message: format!("Tool {name} was not found.") })?;

		definition.validate_args(args)?;

		if definition.name == SqlQueryTool::NAME {
			let sql = args.get("sql").and_then(Value::as_str).ok_or_else(|| {
				Error::InvalidRequest { message: "sql must be a string.".to_string() }
			})?;
			let response = self.database_query(tenant_id, sql).await?;

			return Ok(ToolOutput {
				name: definition.name,
				output: response.output.clone(),
				data: to_value(&response)?,
			});
		}

		let (knowledge_base_id, params) = HybridSearchTool::parse_args(args)?;
		let response = self.hybrid_search(tenant_id, &knowledge_base_id, params).await?;

		Ok(ToolOutput {
			name: definition.name,
			output: HybridSearchTool::render(&response),
			data: to_value(&response)?,
		})
	}
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
	serde_json::to_value(value).map_err(|err| Error::InvalidRequest {
		message: format!("Failed to encode tool output: {err}."),
	})
}

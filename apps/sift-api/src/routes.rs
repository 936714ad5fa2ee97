use axum::{
	Json, Router,
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;

use sift_service::{Error, HybridSearchParams, HybridSearchResponse, ToolDefinition, ToolOutput};

use crate::state::AppState;

pub const HEADER_TENANT_ID: &str = "X-Sift-Tenant-Id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/knowledge-bases/{kb_id}/hybrid-search", post(hybrid_search))
		.route("/v1/tools", get(list_tools))
		.route("/v1/tools/{name}", post(call_tool))
		.with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
	pub tools: Vec<ToolDefinition>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn hybrid_search(
	State(state): State<AppState>,
	Path(kb_id): Path<String>,
	headers: HeaderMap,
	Json(params): Json<HybridSearchParams>,
) -> Result<Json<HybridSearchResponse>, ApiError> {
	let tenant_id = tenant_id(&headers)?;
	let response = state.service.hybrid_search(&tenant_id, &kb_id, params).await?;

	Ok(Json(response))
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
	Json(ToolsResponse { tools: state.service.tool_definitions() })
}

async fn call_tool(
	State(state): State<AppState>,
	Path(name): Path<String>,
	headers: HeaderMap,
	Json(args): Json<Value>,
) -> Result<Json<ToolOutput>, ApiError> {
	let tenant_id = tenant_id(&headers)?;
	let output = state.service.call_tool(&tenant_id, &name, &args).await?;

	Ok(Json(output))
}

fn tenant_id(headers: &HeaderMap) -> Result<String, ApiError> {
	headers
		.get(HEADER_TENANT_ID)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
		.ok_or_else(|| {
			json_error(
				StatusCode::BAD_REQUEST,
				"INVALID_REQUEST",
				format!("{HEADER_TENANT_ID} header is required."),
				Some(vec![HEADER_TENANT_ID.to_string()]),
			)
		})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::SqlValidation(err) => json_error(
				StatusCode::UNPROCESSABLE_ENTITY,
				"SQL_REJECTED",
				err.to_string(),
				Some(vec!["sql".to_string()]),
			),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider request failed.");

				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message, None)
			},
			Error::SearchEngine { message } => {
				tracing::error!(error = %message, "Search engine request failed.");

				json_error(StatusCode::BAD_GATEWAY, "SEARCH_ENGINE_ERROR", message, None)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage request failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL_ERROR",
					"Internal error.",
					None,
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

use std::time::Duration;

use reqwest::{Client, header::AUTHORIZATION};
use serde_json::Value;

use crate::Result;

/// What the engine answered. A non-2xx status is reported through `is_error`, not as `Err`.
#[derive(Debug, Clone)]
pub struct RawSearchResponse {
	pub is_error: bool,
	pub status: u16,
	pub body: Value,
	pub raw: String,
}

pub struct ElasticsearchStore {
	pub client: Client,
	pub url: String,
	pub index: String,
	auth: EsAuth,
}

enum EsAuth {
	None,
	Basic { username: String, password: Option<String> },
	ApiKey(String),
}

impl ElasticsearchStore {
	pub fn new(cfg: &sift_config::Elasticsearch) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let auth = match (cfg.api_key.as_ref(), cfg.username.as_ref()) {
			(Some(api_key), _) => EsAuth::ApiKey(api_key.clone()),
			(None, Some(username)) =>
				EsAuth::Basic { username: username.clone(), password: cfg.password.clone() },
			(None, None) => EsAuth::None,
		};

		Ok(Self { client, url: cfg.url.clone(), index: cfg.index.clone(), auth })
	}

	pub async fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse> {
		let url = format!("{}/{}/_search", self.url, index);
		let request = self.client.post(url).json(body);
		let request = match &self.auth {
			EsAuth::None => request,
			EsAuth::Basic { username, password } => request.basic_auth(username, password.as_ref()),
			EsAuth::ApiKey(api_key) => request.header(AUTHORIZATION, format!("ApiKey {api_key}")),
		};
		let response = request.send().await?;
		let status = response.status();
		let raw = response.text().await?;
		let body = serde_json::from_str::<Value>(&raw).unwrap_or(Value::Null);

		Ok(RawSearchResponse {
			is_error: !status.is_success(),
			status: status.as_u16(),
			body,
			raw,
		})
	}
}

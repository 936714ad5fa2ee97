mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Elasticsearch, EmbeddingProviderConfig, McpContext, Postgres, Providers, Search,
	Security, Service, Sql, Storage,
};

use std::{
	fs,
	path::{Path, PathBuf},
};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	from_toml(&raw, path.to_path_buf())
}

/// Parses an in-memory document. Parse errors report an empty path.
pub fn parse(raw: &str) -> Result<Config> {
	from_toml(raw, PathBuf::new())
}

fn from_toml(raw: &str, path: PathBuf) -> Result<Config> {
	let mut cfg: Config =
		toml::from_str(raw).map_err(|err| Error::ParseConfig { path, source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.mcp_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.mcp_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.elasticsearch.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.elasticsearch.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.elasticsearch.index.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.elasticsearch.index must be non-empty.".to_string(),
		});
	}
	if cfg.storage.elasticsearch.password.is_some() && cfg.storage.elasticsearch.username.is_none()
	{
		return Err(Error::Validation {
			message: "storage.elasticsearch.password requires storage.elasticsearch.username."
				.to_string(),
		});
	}

	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		if embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.embedding.api_key must be non-empty.".to_string(),
			});
		}
		if embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
	}

	if cfg.search.default_match_count == 0 {
		return Err(Error::Validation {
			message: "search.default_match_count must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_match_count < cfg.search.default_match_count {
		return Err(Error::Validation {
			message: "search.max_match_count must be at least search.default_match_count."
				.to_string(),
		});
	}

	for (label, value) in [
		("search.vector_threshold", cfg.search.vector_threshold),
		("search.keyword_threshold", cfg.search.keyword_threshold),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value <= 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.search.vector_threshold > 1.0 {
		return Err(Error::Validation {
			message: "search.vector_threshold must be 1.0 or less.".to_string(),
		});
	}

	for (label, value) in [
		("search.content_field", &cfg.search.content_field),
		("search.vector_field", &cfg.search.vector_field),
		("search.knowledge_base_field", &cfg.search.knowledge_base_field),
		("search.knowledge_field", &cfg.search.knowledge_field),
		("search.tag_field", &cfg.search.tag_field),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.sql.statement_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "sql.statement_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if let Some(mcp) = cfg.mcp.as_ref()
		&& mcp.tenant_id.trim().is_empty()
	{
		return Err(Error::Validation { message: "mcp.tenant_id must be non-empty.".to_string() });
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let es = &mut cfg.storage.elasticsearch;

	for value in [&mut es.username, &mut es.password, &mut es.api_key] {
		if value.as_deref().map(|raw| raw.trim().is_empty()).unwrap_or(false) {
			*value = None;
		}
	}

	es.url = es.url.trim().trim_end_matches('/').to_string();
}

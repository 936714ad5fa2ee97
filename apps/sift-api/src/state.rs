use std::sync::Arc;

use sift_service::SiftService;
use sift_storage::{db::Db, elasticsearch::ElasticsearchStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
}
impl AppState {
	pub async fn new(config: sift_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let engine = ElasticsearchStore::new(&config.storage.elasticsearch)?;
		let service = SiftService::new(config, db, engine);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: SiftService) -> Self {
		Self { service: Arc::new(service) }
	}
}

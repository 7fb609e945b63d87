use std::sync::Arc;

use anyhow::{Context as _, Result};
use ps_api_client::ApiClient;
use ps_config::SyncConfig;
use ps_sync::{FileStore, SyncService};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
	Human,
	Json,
}

pub struct Context {
	pub service: Arc<SyncService>,
	pub config: SyncConfig,
	pub format: OutputFormat,
}

impl Context {
	/// Opens the on-disk queue under the configured data directory and wires it to the API.
	pub async fn open(config: SyncConfig, format: OutputFormat) -> Result<Self> {
		let store = FileStore::open(config.sync_dir())
			.await
			.context("Failed to open the sync store")?;
		let api = ApiClient::new(config.request_config())?;

		let service = SyncService::open(Arc::new(store), Arc::new(api))
			.await
			.context("Failed to load the change queue")?;

		Ok(Self {
			service: Arc::new(service),
			config,
			format,
		})
	}
}

//! Sync client configuration

use crate::{default_data_dir, Migrate};

use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use anyhow::{anyhow, Context, Result};
use ps_api_client::{RequestConfig, DEFAULT_API_URL};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "pestscan.json";

pub const API_URL_ENV: &str = "PESTSCAN_API_URL";
pub const AUTH_TOKEN_ENV: &str = "PESTSCAN_AUTH_TOKEN";

fn default_auto_sync_interval_secs() -> u64 {
	60
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Config schema version
	pub version: u32,

	/// Where the queue, sync state and logs live
	pub data_dir: PathBuf,

	/// Base URL of the REST API, without a trailing slash
	pub api_url: String,

	pub request_timeout_secs: u64,

	/// Budget for the `/health` liveness probe
	pub health_timeout_secs: u64,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auth_token: Option<String>,

	#[serde(default = "default_auto_sync_interval_secs")]
	pub auto_sync_interval_secs: u64,

	pub log_level: String,
}

impl SyncConfig {
	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		Self::load_from(&default_data_dir()?)
	}

	/// Load configuration from `data_dir`, writing defaults if no file exists yet.
	///
	/// [`API_URL_ENV`] and [`AUTH_TOKEN_ENV`] take precedence over the file, but are
	/// never written back to it.
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let mut config = Self::read_or_create(data_dir)?;
		config.apply_overrides(|key| std::env::var(key).ok());

		Ok(config)
	}

	fn read_or_create(data_dir: &Path) -> Result<Self> {
		let config_path = Self::config_path(data_dir);

		if !config_path.exists() {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			return Ok(config);
		}

		info!("Loading config from {:?}", config_path);
		let json = fs::read_to_string(&config_path)
			.with_context(|| format!("Failed to read {}", config_path.display()))?;
		let mut config: Self = serde_json::from_str(&json)
			.with_context(|| format!("Failed to parse {}", config_path.display()))?;

		if config.current_version() < Self::target_version() {
			info!(
				"Migrating config from v{} to v{}",
				config.version,
				Self::target_version()
			);
			config.migrate()?;
			config.save()?;
		}

		Ok(config)
	}

	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			api_url: DEFAULT_API_URL.to_string(),
			request_timeout_secs: 30,
			health_timeout_secs: 5,
			auth_token: None,
			auto_sync_interval_secs: default_auto_sync_interval_secs(),
			log_level: "info".to_string(),
		}
	}

	pub fn config_path(data_dir: &Path) -> PathBuf {
		data_dir.join(CONFIG_FILE_NAME)
	}

	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = Self::config_path(&self.data_dir);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)
			.with_context(|| format!("Failed to write {}", config_path.display()))?;
		info!("Saved config to {:?}", config_path);

		Ok(())
	}

	fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

		if let Some(api_url) = lookup(API_URL_ENV) {
			self.api_url = api_url;
		}
		if let Some(token) = lookup(AUTH_TOKEN_ENV) {
			self.auth_token = Some(token);
		}
	}

	/// Directory backing the queue's key-value store
	pub fn sync_dir(&self) -> PathBuf {
		self.data_dir.join("sync")
	}

	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	pub fn auto_sync_interval(&self) -> Duration {
		Duration::from_secs(self.auto_sync_interval_secs.max(1))
	}

	pub fn request_config(&self) -> RequestConfig {
		RequestConfig {
			api_url: self.api_url.clone(),
			request_timeout: Duration::from_secs(self.request_timeout_secs),
			health_timeout: Duration::from_secs(self.health_timeout_secs),
			auth_token: self.auth_token.clone(),
		}
	}
}

impl Migrate for SyncConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		1
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			// v0 files predate the auto sync interval, which serde already defaulted
			0 => {
				self.version = 1;
				Ok(())
			}
			1 => Ok(()),
			v => Err(anyhow!("Unknown config version: {v}")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use pretty_assertions::assert_eq;
	use serde_json::json;
	use tempfile::tempdir;

	#[test]
	fn missing_file_is_created_with_defaults() {
		let dir = tempdir().unwrap();

		let config = SyncConfig::read_or_create(dir.path()).unwrap();

		assert_eq!(config, SyncConfig::default_with_dir(dir.path().to_path_buf()));
		assert!(dir.path().join(CONFIG_FILE_NAME).exists());
		assert_eq!(config.request_config().api_url, "http://localhost:8080/api");
		assert_eq!(config.request_config().health_timeout, Duration::from_secs(5));
	}

	#[test]
	fn saved_values_are_read_back() {
		let dir = tempdir().unwrap();
		let mut config = SyncConfig::default_with_dir(dir.path().to_path_buf());
		config.api_url = "https://scout.example.org/api".to_string();
		config.auto_sync_interval_secs = 15;
		config.save().unwrap();

		let loaded = SyncConfig::read_or_create(dir.path()).unwrap();

		assert_eq!(loaded, config);
		assert_eq!(loaded.auto_sync_interval(), Duration::from_secs(15));
	}

	#[test]
	fn version_zero_files_are_migrated() {
		let dir = tempdir().unwrap();
		fs::write(
			dir.path().join(CONFIG_FILE_NAME),
			json!({
				"version": 0,
				"data_dir": dir.path(),
				"api_url": "http://10.0.2.2:8080/api",
				"request_timeout_secs": 30,
				"health_timeout_secs": 5,
				"log_level": "debug"
			})
			.to_string(),
		)
		.unwrap();

		let config = SyncConfig::read_or_create(dir.path()).unwrap();

		assert_eq!(config.version, 1);
		assert_eq!(config.auto_sync_interval_secs, 60);
		assert_eq!(config.api_url, "http://10.0.2.2:8080/api");

		let on_disk: serde_json::Value =
			serde_json::from_str(&fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap())
				.unwrap();
		assert_eq!(on_disk["version"], 1);
	}

	#[test]
	fn unknown_versions_are_rejected() {
		let mut config = SyncConfig::default_with_dir(PathBuf::from("."));
		config.version = 7;

		assert!(config.migrate().is_err());
	}

	#[test]
	fn environment_overrides_file_values() {
		let mut config = SyncConfig::default_with_dir(PathBuf::from("."));

		config.apply_overrides(|key| match key {
			API_URL_ENV => Some("https://staging.example.org/api".to_string()),
			AUTH_TOKEN_ENV => Some("  ".to_string()),
			_ => None,
		});

		assert_eq!(config.api_url, "https://staging.example.org/api");
		assert_eq!(config.auth_token, None);
	}
}

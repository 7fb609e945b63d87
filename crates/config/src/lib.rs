use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

mod sync_config;

pub use sync_config::{SyncConfig, API_URL_ENV, AUTH_TOKEN_ENV, CONFIG_FILE_NAME};

/// Versioned on-disk configuration
pub trait Migrate {
	fn current_version(&self) -> u32;

	fn target_version() -> u32;

	/// Bring the loaded value up to [`Migrate::target_version`]
	fn migrate(&mut self) -> Result<()>;
}

/// Platform-specific data directory resolution
pub fn default_data_dir() -> Result<PathBuf> {
	#[cfg(any(target_os = "macos", target_os = "ios", target_os = "android"))]
	let dir = dirs::data_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("pestscan");

	#[cfg(target_os = "windows")]
	let dir = dirs::data_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("PestScan");

	#[cfg(not(any(
		target_os = "macos",
		target_os = "ios",
		target_os = "android",
		target_os = "windows"
	)))]
	let dir = dirs::data_local_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("pestscan");

	fs::create_dir_all(&dir)?;

	Ok(dir)
}

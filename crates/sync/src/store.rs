//! Durable string key-value storage backing the change queue.

use std::{
	collections::HashMap,
	io,
	path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::trace;

use crate::error::{FileIOError, StoreError};

/// Read returns the last write; a write replaces the whole value of its key atomically.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

	async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Stores every key as its own file inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
	root: PathBuf,
}

impl FileStore {
	pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
		let root = root.as_ref();
		fs::create_dir_all(root)
			.await
			.map_err(|e| FileIOError::from((root, e, "Failed to create store directory")))?;

		Ok(Self { root: root.into() })
	}

	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	fn path_for(&self, key: &str) -> PathBuf {
		let file_name = key
			.chars()
			.map(|c| {
				if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
					c
				} else {
					'_'
				}
			})
			.collect::<String>();

		self.root.join(format!("{file_name}.json"))
	}
}

#[async_trait]
impl KeyValueStore for FileStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let path = self.path_for(key);
		match fs::read_to_string(&path).await {
			Ok(value) => Ok(Some(value)),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(FileIOError::from((path, e)).into()),
		}
	}

	async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
		let path = self.path_for(key);
		let tmp_path = path.with_extension("json.tmp");

		// Readers only ever see the old or the new file, never a torn write.
		fs::write(&tmp_path, value.as_bytes())
			.await
			.map_err(|e| FileIOError::from((&tmp_path, e, "Failed to write temporary file")))?;
		fs::rename(&tmp_path, &path)
			.await
			.map_err(|e| FileIOError::from((&path, e, "Failed to replace store file")))?;

		trace!(key, bytes = value.len(), "Persisted store key");

		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StoreError> {
		let path = self.path_for(key);
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(FileIOError::from((path, e)).into()),
		}
	}
}

/// Process-local store, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl KeyValueStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.entries.read().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
		self.entries.write().await.insert(key.to_string(), value);
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.entries.write().await.remove(key);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use tempfile::tempdir;

	use super::*;

	#[tokio::test]
	async fn file_store_outlives_its_handle() {
		let dir = tempdir().unwrap();

		{
			let store = FileStore::open(dir.path()).await.unwrap();
			store
				.set("@pestscan/pending_changes", "[1,2]".to_string())
				.await
				.unwrap();
		}

		let reopened = FileStore::open(dir.path()).await.unwrap();
		assert_eq!(
			reopened.get("@pestscan/pending_changes").await.unwrap().as_deref(),
			Some("[1,2]")
		);
		assert!(dir.path().join("_pestscan_pending_changes.json").exists());
		assert!(!dir.path().join("_pestscan_pending_changes.json.tmp").exists());
	}

	#[tokio::test]
	async fn missing_keys_read_as_none_and_remove_is_idempotent() {
		let dir = tempdir().unwrap();
		let store = FileStore::open(dir.path().join("nested")).await.unwrap();

		assert_eq!(store.get("absent").await.unwrap(), None);
		store.remove("absent").await.unwrap();

		store.set("k", "v".to_string()).await.unwrap();
		store.remove("k").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), None);
	}

	#[tokio::test]
	async fn memory_store_overwrites() {
		let store = MemoryStore::new();
		store.set("k", "a".to_string()).await.unwrap();
		store.set("k", "b".to_string()).await.unwrap();
		assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
	}
}

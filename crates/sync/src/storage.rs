use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::{change::PendingChange, error::PersistenceError, status::SyncState, store::KeyValueStore};

pub const SYNC_STATE_KEY: &str = "@pestscan/sync";
pub const PENDING_CHANGES_KEY: &str = "@pestscan/pending_changes";

/// Typed view over the two store keys the sync core owns.
#[derive(Clone)]
pub struct SyncStorage {
	store: Arc<dyn KeyValueStore>,
}

impl SyncStorage {
	pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
		Self { store }
	}

	pub async fn load_changes(&self) -> Result<Vec<PendingChange>, PersistenceError> {
		Ok(self.load(PENDING_CHANGES_KEY).await?.unwrap_or_default())
	}

	pub async fn save_changes(&self, changes: &[PendingChange]) -> Result<(), PersistenceError> {
		self.save(PENDING_CHANGES_KEY, changes).await
	}

	/// Drops the stored list entirely, which reads back as empty.
	pub async fn clear_changes(&self) -> Result<(), PersistenceError> {
		self.store.remove(PENDING_CHANGES_KEY).await.map_err(Into::into)
	}

	pub async fn load_state(&self) -> Result<SyncState, PersistenceError> {
		Ok(self.load(SYNC_STATE_KEY).await?.unwrap_or_default())
	}

	pub async fn save_state(&self, state: &SyncState) -> Result<(), PersistenceError> {
		self.save(SYNC_STATE_KEY, state).await
	}

	async fn load<T: DeserializeOwned>(
		&self,
		key: &'static str,
	) -> Result<Option<T>, PersistenceError> {
		self.store
			.get(key)
			.await?
			.map(|raw| {
				serde_json::from_str(&raw)
					.map_err(|source| PersistenceError::Serialization { key, source })
			})
			.transpose()
	}

	async fn save<T: Serialize + ?Sized>(
		&self,
		key: &'static str,
		value: &T,
	) -> Result<(), PersistenceError> {
		let raw = serde_json::to_string(value)
			.map_err(|source| PersistenceError::Serialization { key, source })?;

		self.store.set(key, raw).await.map_err(Into::into)
	}
}

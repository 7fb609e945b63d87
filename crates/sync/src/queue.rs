use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
	change::{ChangeId, ChangeKind, Entity, PendingChange},
	error::PersistenceError,
	status::StatusPublisher,
	storage::SyncStorage,
};

/// Durable FIFO list of [`PendingChange`]s.
///
/// Every mutation reads the stored list, edits it and writes the whole list back, then
/// publishes exactly one status update. Mutations are serialized so concurrent callers in
/// the same process can't overwrite each other's edits.
pub struct ChangeQueue {
	storage: SyncStorage,
	publisher: Arc<StatusPublisher>,
	write_lock: Mutex<()>,
}

impl ChangeQueue {
	pub fn new(storage: SyncStorage, publisher: Arc<StatusPublisher>) -> Self {
		Self {
			storage,
			publisher,
			write_lock: Mutex::new(()),
		}
	}

	pub async fn append(
		&self,
		kind: ChangeKind,
		entity: Entity,
		data: Value,
	) -> Result<PendingChange, PersistenceError> {
		let _guard = self.write_lock.lock().await;
		let mut changes = self.storage.load_changes().await?;

		let mut change = PendingChange::new(kind, entity, data);
		while changes.iter().any(|existing| existing.id == change.id) {
			change.id = ChangeId::generate();
		}

		debug!(id = %change.id, kind = %change.kind, entity = %change.entity, "Queueing pending change");
		changes.push(change.clone());

		self.commit(&changes).await?;

		Ok(change)
	}

	/// Read fresh from storage on every call.
	pub async fn list(&self) -> Result<Vec<PendingChange>, PersistenceError> {
		self.storage.load_changes().await
	}

	pub async fn remove(&self, id: &ChangeId) -> Result<(), PersistenceError> {
		let _guard = self.write_lock.lock().await;
		let mut changes = self.storage.load_changes().await?;

		let before = changes.len();
		changes.retain(|change| &change.id != id);
		if changes.len() == before {
			return Ok(());
		}

		self.commit(&changes).await
	}

	/// Records a failed delivery attempt.
	pub async fn mark_attempt(
		&self,
		id: &ChangeId,
		error: Option<String>,
	) -> Result<(), PersistenceError> {
		let _guard = self.write_lock.lock().await;
		let mut changes = self.storage.load_changes().await?;

		let Some(change) = changes.iter_mut().find(|change| &change.id == id) else {
			return Ok(());
		};
		change.record_failure(error);

		self.commit(&changes).await
	}

	pub async fn clear_all(&self) -> Result<(), PersistenceError> {
		let _guard = self.write_lock.lock().await;

		self.storage.clear_changes().await?;
		self.publisher.publish(&[]).await;

		Ok(())
	}

	/// Drops only the changes that ran out of retries.
	pub async fn clear_failed(&self) -> Result<(), PersistenceError> {
		let _guard = self.write_lock.lock().await;
		let mut changes = self.storage.load_changes().await?;

		changes.retain(PendingChange::is_eligible);

		self.commit(&changes).await
	}

	async fn commit(&self, changes: &[PendingChange]) -> Result<(), PersistenceError> {
		self.storage.save_changes(changes).await?;
		self.publisher.publish(changes).await;

		Ok(())
	}
}

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::{
	change::{ChangeKind, Entity, PendingChange},
	error::PersistenceError,
	queue::ChangeQueue,
	remote::RemoteApi,
	status::{StatusPublisher, Subscription, SyncStatus},
	storage::SyncStorage,
	store::KeyValueStore,
	synchronizer::{SyncOutcome, Synchronizer},
};

/// Entry point the rest of the application talks to.
///
/// Construct one per process and share it behind an [`Arc`]; nothing else should touch the
/// store keys it owns.
pub struct SyncService {
	queue: Arc<ChangeQueue>,
	publisher: Arc<StatusPublisher>,
	synchronizer: Synchronizer,
	api: Arc<dyn RemoteApi>,
}

impl SyncService {
	pub async fn open(
		store: Arc<dyn KeyValueStore>,
		api: Arc<dyn RemoteApi>,
	) -> Result<Self, PersistenceError> {
		let storage = SyncStorage::new(store);
		let publisher = Arc::new(StatusPublisher::open(storage.clone()).await?);
		let queue = Arc::new(ChangeQueue::new(storage, Arc::clone(&publisher)));
		let synchronizer =
			Synchronizer::new(Arc::clone(&queue), Arc::clone(&publisher), Arc::clone(&api));

		Ok(Self {
			queue,
			publisher,
			synchronizer,
			api,
		})
	}

	pub async fn add_pending_change(
		&self,
		kind: ChangeKind,
		entity: Entity,
		data: Value,
	) -> Result<PendingChange, PersistenceError> {
		self.queue.append(kind, entity, data).await
	}

	pub async fn pending_changes(&self) -> Result<Vec<PendingChange>, PersistenceError> {
		self.queue.list().await
	}

	pub async fn sync(&self) -> SyncOutcome {
		self.synchronizer.sync().await
	}

	pub async fn get_sync_status(&self) -> Result<SyncStatus, PersistenceError> {
		self.publisher.get_status().await
	}

	pub fn subscribe(
		&self,
		observer: impl Fn(&SyncStatus) + Send + Sync + 'static,
	) -> Subscription {
		self.publisher.subscribe(observer)
	}

	pub async fn clear_pending_changes(&self) -> Result<(), PersistenceError> {
		self.queue.clear_all().await
	}

	pub async fn clear_failed_changes(&self) -> Result<(), PersistenceError> {
		self.queue.clear_failed().await
	}

	/// Probes the API's health endpoint; any error counts as offline.
	pub async fn is_online(&self) -> bool {
		match self.api.check_health().await {
			Ok(()) => true,
			Err(e) => {
				debug!("Health check failed: {e}");
				false
			}
		}
	}

	#[must_use]
	pub fn queue(&self) -> &ChangeQueue {
		&self.queue
	}

	#[must_use]
	pub fn is_syncing(&self) -> bool {
		self.synchronizer.is_running()
	}
}

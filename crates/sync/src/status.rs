use std::{
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::{change::PendingChange, error::PersistenceError, storage::SyncStorage};

/// Persisted sync bookkeeping, the only part of [`SyncStatus`] not derived from the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
	#[serde(default)]
	pub is_syncing: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_sync_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
	pub last_sync_at: Option<DateTime<Utc>>,
	pub is_syncing: bool,
	pub pending_changes: usize,
	pub failed_changes: usize,
}

impl SyncStatus {
	#[must_use]
	pub fn derive(state: &SyncState, changes: &[PendingChange]) -> Self {
		Self {
			last_sync_at: state.last_sync_at,
			is_syncing: state.is_syncing,
			pending_changes: changes.len(),
			failed_changes: changes
				.iter()
				.filter(|change| change.has_exhausted_retries())
				.count(),
		}
	}

	/// Changes a sync pass would still try to deliver.
	#[must_use]
	pub const fn eligible_changes(&self) -> usize {
		self.pending_changes.saturating_sub(self.failed_changes)
	}
}

type Observer = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

#[derive(Default)]
struct Observers {
	next_id: u64,
	entries: Vec<(u64, Observer)>,
}

fn lock(observers: &Mutex<Observers>) -> MutexGuard<'_, Observers> {
	// Observers run outside the lock, so a poisoned lock still holds a consistent list.
	observers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by [`StatusPublisher::subscribe`].
pub struct Subscription {
	id: u64,
	observers: Weak<Mutex<Observers>>,
}

impl Subscription {
	/// Stops deliveries to this observer. Calling it again does nothing.
	pub fn unsubscribe(&self) {
		if let Some(observers) = self.observers.upgrade() {
			lock(&observers).entries.retain(|(id, _)| *id != self.id);
		}
	}
}

/// Derives [`SyncStatus`] and pushes it to observers whenever the queue or sync state moves.
pub struct StatusPublisher {
	storage: SyncStorage,
	state: RwLock<SyncState>,
	observers: Arc<Mutex<Observers>>,
}

impl StatusPublisher {
	/// Loads the persisted sync state.
	///
	/// A stored `isSyncing = true` can only come from a process that died mid pass, so it is
	/// reset here instead of being trusted, otherwise the status would read as syncing forever.
	///
	/// The store must belong to a single process. After this call the sync flag is served
	/// from memory: [`Self::get_status`] never re-reads it, and opening a second publisher
	/// on the same store clears the flag of a pass another process is still running.
	pub async fn open(storage: SyncStorage) -> Result<Self, PersistenceError> {
		let mut state = storage.load_state().await?;

		if state.is_syncing {
			warn!("Found a sync pass left unfinished by a previous run, resetting sync state");
			state.is_syncing = false;
			storage.save_state(&state).await?;
		}

		Ok(Self {
			storage,
			state: RwLock::new(state),
			observers: Arc::default(),
		})
	}

	pub fn subscribe(&self, observer: impl Fn(&SyncStatus) + Send + Sync + 'static) -> Subscription {
		let mut observers = lock(&self.observers);
		let id = observers.next_id;
		observers.next_id += 1;
		observers.entries.push((id, Arc::new(observer)));

		Subscription {
			id,
			observers: Arc::downgrade(&self.observers),
		}
	}

	#[must_use]
	pub fn observer_count(&self) -> usize {
		lock(&self.observers).entries.len()
	}

	pub async fn state(&self) -> SyncState {
		self.state.read().await.clone()
	}

	/// Recomputed from a fresh read of the queue; the sync flag comes from this process.
	pub async fn get_status(&self) -> Result<SyncStatus, PersistenceError> {
		let changes = self.storage.load_changes().await?;
		Ok(self.status_for(&changes).await)
	}

	pub(crate) async fn status_for(&self, changes: &[PendingChange]) -> SyncStatus {
		SyncStatus::derive(&*self.state.read().await, changes)
	}

	/// Persists a new sync state, then notifies with the queue as currently stored.
	pub(crate) async fn transition(&self, state: SyncState) -> Result<(), PersistenceError> {
		self.storage.save_state(&state).await?;
		*self.state.write().await = state;

		let changes = self.storage.load_changes().await?;
		self.publish(&changes).await;

		Ok(())
	}

	/// Calls every observer, in subscription order, with the status for `changes`.
	pub(crate) async fn publish(&self, changes: &[PendingChange]) {
		let status = self.status_for(changes).await;

		let observers = lock(&self.observers)
			.entries
			.iter()
			.map(|(id, observer)| (*id, Arc::clone(observer)))
			.collect::<Vec<_>>();

		for (id, observer) in observers {
			if catch_unwind(AssertUnwindSafe(|| observer(&status))).is_err() {
				error!(observer_id = id, "Sync status observer panicked");
			}
		}
	}
}

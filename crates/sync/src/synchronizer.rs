use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::{
	change::PendingChange,
	error::{DispatchError, PersistenceError},
	queue::ChangeQueue,
	remote::{RemoteApi, RemoteCall},
	status::{StatusPublisher, SyncState},
};

/// Result of one [`Synchronizer::sync`] call.
///
/// `success` is false only when the pass was refused because another one was running, or
/// when the store failed under it; per change failures are counted in `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
	pub success: bool,
	pub synced: usize,
	pub failed: usize,
}

impl SyncOutcome {
	#[must_use]
	pub const fn rejected() -> Self {
		Self {
			success: false,
			synced: 0,
			failed: 0,
		}
	}
}

struct PassGuard<'flag>(&'flag AtomicBool);

impl<'flag> PassGuard<'flag> {
	fn acquire(flag: &'flag AtomicBool) -> Option<Self> {
		flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| Self(flag))
	}
}

impl Drop for PassGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Drains the change queue against the remote API, one pass at a time.
pub struct Synchronizer {
	queue: Arc<ChangeQueue>,
	publisher: Arc<StatusPublisher>,
	api: Arc<dyn RemoteApi>,
	in_progress: AtomicBool,
}

impl Synchronizer {
	pub fn new(
		queue: Arc<ChangeQueue>,
		publisher: Arc<StatusPublisher>,
		api: Arc<dyn RemoteApi>,
	) -> Self {
		Self {
			queue,
			publisher,
			api,
			in_progress: AtomicBool::new(false),
		}
	}

	#[must_use]
	pub fn is_running(&self) -> bool {
		self.in_progress.load(Ordering::Acquire)
	}

	/// Runs one pass over a snapshot of the queue.
	///
	/// Calling this while a pass is running returns [`SyncOutcome::rejected`] right away;
	/// nothing is queued, callers retrigger later.
	pub async fn sync(&self) -> SyncOutcome {
		let Some(_guard) = PassGuard::acquire(&self.in_progress) else {
			info!("Sync already in progress");
			return SyncOutcome::rejected();
		};

		let mut outcome = SyncOutcome::default();
		match self.run_pass(&mut outcome).await {
			Ok(()) => outcome.success = true,
			Err(e) => error!(?outcome, "Sync pass aborted: {e:#}"),
		}

		if let Err(e) = self
			.publisher
			.transition(SyncState {
				is_syncing: false,
				last_sync_at: Some(Utc::now()),
			})
			.await
		{
			error!("Failed to record the end of a sync pass: {e:#}");
		}

		info!(
			synced = outcome.synced,
			failed = outcome.failed,
			success = outcome.success,
			"Sync pass finished"
		);

		outcome
	}

	#[instrument(skip_all)]
	async fn run_pass(&self, outcome: &mut SyncOutcome) -> Result<(), PersistenceError> {
		self.publisher
			.transition(SyncState {
				is_syncing: true,
				last_sync_at: Some(Utc::now()),
			})
			.await?;

		let changes = self.queue.list().await?;
		info!("Syncing {} pending changes", changes.len());

		for change in changes {
			if change.has_exhausted_retries() {
				debug!(id = %change.id, "Skipping change, max attempts reached");
				outcome.failed += 1;
				continue;
			}

			match self.deliver(&change).await {
				Ok(()) => {
					self.queue.remove(&change.id).await?;
					outcome.synced += 1;
				}
				Err(e) => {
					warn!(id = %change.id, entity = %change.entity, kind = %change.kind, "Failed to sync change: {e}");
					self.queue.mark_attempt(&change.id, Some(e.to_string())).await?;
					outcome.failed += 1;
				}
			}
		}

		Ok(())
	}

	#[instrument(skip_all, fields(id = %change.id))]
	async fn deliver(&self, change: &PendingChange) -> Result<(), DispatchError> {
		let call = RemoteCall::for_change(change)?;
		debug!(%call, "Delivering change");

		self.api.execute(call).await.map_err(Into::into)
	}
}

use std::{sync::Arc, time::Duration};

use async_channel as chan;
use tokio::{
	spawn,
	task::JoinHandle,
	time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{service::SyncService, synchronizer::SyncOutcome};

/// Background loop that runs a sync pass whenever the API is reachable and there is
/// something left to deliver.
pub struct AutoSync {
	stop_tx: chan::Sender<()>,
	handle: JoinHandle<()>,
}

impl AutoSync {
	/// Starts the loop; the first check happens immediately.
	pub fn spawn(service: Arc<SyncService>, period: Duration) -> Self {
		let (stop_tx, stop_rx) = chan::bounded(1);

		let handle = spawn(async move {
			let mut ticker = interval(period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

			info!(?period, "Auto sync started");

			loop {
				tokio::select! {
					_ = stop_rx.recv() => break,
					_ = ticker.tick() => {
						if let Some(outcome) = Self::tick(&service).await {
							debug!(?outcome, "Auto sync pass done");
						}
					}
				}
			}

			info!("Auto sync stopped");
		});

		Self { stop_tx, handle }
	}

	/// One check: skips when nothing is eligible or the API is unreachable.
	pub async fn tick(service: &SyncService) -> Option<SyncOutcome> {
		match service.get_sync_status().await {
			Ok(status) if status.eligible_changes() == 0 => return None,
			Ok(_) => {}
			Err(e) => {
				error!("Failed to read sync status: {e:#}");
				return None;
			}
		}

		if !service.is_online().await {
			debug!("Remote API unreachable, postponing sync");
			return None;
		}

		Some(service.sync().await)
	}

	/// Stops the loop once any pass in flight has run to completion; a pass is never
	/// aborted halfway.
	pub async fn stop(self) {
		if self.stop_tx.send(()).await.is_err() {
			warn!("Auto sync loop already gone");
		}

		if let Err(e) = self.handle.await {
			error!("Auto sync loop failed: {e:#?}");
		}
	}
}

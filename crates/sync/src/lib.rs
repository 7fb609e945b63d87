//!
//! # PestScan Sync
//!
//! Offline change queue for the scouting client. Mutations made while the device may be
//! offline are recorded as [`PendingChange`]s in a durable FIFO list, delivered to the REST
//! API by [`Synchronizer`] passes with at most [`MAX_RETRY_ATTEMPTS`] tries each, and every
//! queue or sync state movement is pushed to observers as a fresh [`SyncStatus`].
//!
//! ## Basic example
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use ps_sync::{ChangeKind, Entity, MemoryStore, RemoteApi, RemoteCall, RemoteError, SyncService};
//! use serde_json::json;
//!
//! struct AlwaysUp;
//!
//! #[async_trait]
//! impl RemoteApi for AlwaysUp {
//!     async fn execute(&self, _call: RemoteCall<'_>) -> Result<(), RemoteError> {
//!         Ok(())
//!     }
//!
//!     async fn check_health(&self) -> Result<(), RemoteError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = SyncService::open(Arc::new(MemoryStore::new()), Arc::new(AlwaysUp))
//!         .await
//!         .unwrap();
//!
//!     service
//!         .add_pending_change(ChangeKind::Create, Entity::Observation, json!({ "count": 4 }))
//!         .await
//!         .unwrap();
//!
//!     let outcome = service.sync().await;
//!     assert!(outcome.success);
//!     assert_eq!(outcome.synced, 1);
//! }
//! ```

#![warn(
	clippy::all,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro,
	deprecated
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod auto_sync;
mod change;
mod error;
mod queue;
mod remote;
mod service;
mod status;
mod storage;
mod store;
mod synchronizer;

pub use auto_sync::AutoSync;
pub use change::{ChangeId, ChangeKind, Entity, PendingChange, MAX_RETRY_ATTEMPTS};
pub use error::{DispatchError, FileIOError, PersistenceError, RemoteError, StoreError};
pub use queue::ChangeQueue;
pub use remote::{PhotoFile, PhotoUpload, RemoteApi, RemoteCall, Resource};
pub use service::SyncService;
pub use status::{StatusPublisher, Subscription, SyncState, SyncStatus};
pub use storage::{SyncStorage, PENDING_CHANGES_KEY, SYNC_STATE_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use synchronizer::{SyncOutcome, Synchronizer};

#![allow(dead_code)]

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc, Mutex,
};

use async_trait::async_trait;
use ps_sync::{
	KeyValueStore, MemoryStore, RemoteApi, RemoteCall, RemoteError, StoreError, SyncService,
};
use tokio::sync::{Notify, Semaphore};

type Responder = dyn Fn(&RemoteCall<'_>) -> Result<(), RemoteError> + Send + Sync;

/// Scripted stand-in for the REST backend that records every call as `METHOD /path`.
pub struct StubApi {
	calls: Mutex<Vec<String>>,
	responder: Box<Responder>,
	gate: Option<Arc<Semaphore>>,
	pub entered: Arc<Notify>,
	online: AtomicBool,
}

impl StubApi {
	pub fn accepting() -> Self {
		Self::responding(|_| Ok(()))
	}

	pub fn responding(
		responder: impl Fn(&RemoteCall<'_>) -> Result<(), RemoteError> + Send + Sync + 'static,
	) -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			responder: Box::new(responder),
			gate: None,
			entered: Arc::new(Notify::new()),
			online: AtomicBool::new(true),
		}
	}

	/// Every call blocks until the returned semaphore is given permits.
	pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
		let gate = Arc::new(Semaphore::new(0));
		self.gate = Some(Arc::clone(&gate));
		(self, gate)
	}

	pub fn set_online(&self, online: bool) {
		self.online.store(online, Ordering::SeqCst);
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}
}

#[async_trait]
impl RemoteApi for StubApi {
	async fn execute(&self, call: RemoteCall<'_>) -> Result<(), RemoteError> {
		self.calls.lock().unwrap().push(call.to_string());
		self.entered.notify_one();

		if let Some(gate) = &self.gate {
			gate.acquire().await.unwrap().forget();
		}

		(self.responder)(&call)
	}

	async fn check_health(&self) -> Result<(), RemoteError> {
		if self.online.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(RemoteError::Network("connection refused".to_string()))
		}
	}
}

/// Memory store whose writes can be switched off to simulate a failing disk.
#[derive(Default)]
pub struct FlakyStore {
	inner: MemoryStore,
	fail_writes: AtomicBool,
}

impl FlakyStore {
	pub fn fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}
}

#[async_trait]
impl KeyValueStore for FlakyStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		self.inner.get(key).await
	}

	async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(StoreError::Unavailable("simulated write failure".to_string()));
		}
		self.inner.set(key, value).await
	}

	async fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.inner.remove(key).await
	}
}

pub async fn service_with(api: Arc<StubApi>) -> Arc<SyncService> {
	Arc::new(
		SyncService::open(Arc::new(MemoryStore::new()), api)
			.await
			.unwrap(),
	)
}

pub fn server_error() -> RemoteError {
	RemoteError::Http {
		status: 500,
		body: "internal error".to_string(),
	}
}

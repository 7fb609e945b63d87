use std::{fmt::Display, path::Path};

use thiserror::Error;

use crate::change::{ChangeKind, Entity};

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: std::io::Error,
	pub maybe_context: Option<&'static str>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"file I/O error{}: {}; path: '{}'",
			self.maybe_context
				.map(|ctx| format!(" ({ctx})"))
				.unwrap_or_default(),
			self.source,
			self.path.display()
		)
	}
}

impl<P: AsRef<Path>> From<(P, std::io::Error)> for FileIOError {
	fn from((path, source): (P, std::io::Error)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}
}

impl<P: AsRef<Path>> From<(P, std::io::Error, &'static str)> for FileIOError {
	fn from((path, source, context): (P, std::io::Error, &'static str)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(context),
		}
	}
}

#[derive(Debug, Error)]
pub enum StoreError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("store unavailable: {0}")]
	Unavailable(String),
}

/// The durable store could not be read or written; the operation that hit it did not apply.
#[derive(Debug, Error)]
pub enum PersistenceError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("malformed record <key='{key}'>: {source}")]
	Serialization {
		key: &'static str,
		#[source]
		source: serde_json::Error,
	},
}

/// Failure reported by a remote API call.
#[derive(Debug, Error)]
pub enum RemoteError {
	#[error("request timed out")]
	Timeout,
	#[error("network error: {0}")]
	Network(String),
	#[error("HTTP {status}: {body}")]
	Http { status: u16, body: String },
	#[error("invalid payload: {0}")]
	InvalidPayload(String),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

/// Why a single pending change could not be delivered.
#[derive(Debug, Error)]
pub enum DispatchError {
	#[error("Unknown entity type: {0}")]
	UnknownEntity(String),
	#[error("Unknown change type: {0}")]
	UnknownKind(String),
	#[error("{kind} is not supported for {entity}")]
	Unsupported { entity: Entity, kind: ChangeKind },
	#[error("{entity} payload has no `id` field")]
	MissingId { entity: Entity },
	#[error(transparent)]
	Remote(#[from] RemoteError),
}

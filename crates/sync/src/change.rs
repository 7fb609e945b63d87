use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A pending change stops being retried once it has failed this many times.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
	/// Time ordered with a random tail, so ids sort roughly by enqueue time.
	#[must_use]
	pub fn generate() -> Self {
		Self(Uuid::now_v7().to_string())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ChangeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ChangeId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for ChangeId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// Operation a pending change replays against the remote API.
///
/// Like [`Entity`], tags from a newer client are kept in [`ChangeKind::Unrecognized`] so
/// one unreadable record can't make the whole queue unloadable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeKind {
	Create,
	Update,
	Delete,
	Unrecognized(String),
}

impl ChangeKind {
	#[must_use]
	pub fn as_str(&self) -> &str {
		match self {
			Self::Create => "CREATE",
			Self::Update => "UPDATE",
			Self::Delete => "DELETE",
			Self::Unrecognized(tag) => tag,
		}
	}
}

impl From<String> for ChangeKind {
	fn from(tag: String) -> Self {
		match tag.as_str() {
			"CREATE" => Self::Create,
			"UPDATE" => Self::Update,
			"DELETE" => Self::Delete,
			_ => Self::Unrecognized(tag),
		}
	}
}

impl From<ChangeKind> for String {
	fn from(kind: ChangeKind) -> Self {
		match kind {
			ChangeKind::Unrecognized(tag) => tag,
			known => known.as_str().to_string(),
		}
	}
}

impl fmt::Display for ChangeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Kind of record a pending change targets.
///
/// Tags this build doesn't know about (written by a newer client) are kept verbatim in
/// [`Entity::Unrecognized`] so the queue can be loaded and saved back without losing them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Entity {
	Observation,
	Session,
	Photo,
	Other,
	Unrecognized(String),
}

impl Entity {
	#[must_use]
	pub fn as_str(&self) -> &str {
		match self {
			Self::Observation => "OBSERVATION",
			Self::Session => "SESSION",
			Self::Photo => "PHOTO",
			Self::Other => "OTHER",
			Self::Unrecognized(tag) => tag,
		}
	}
}

impl From<String> for Entity {
	fn from(tag: String) -> Self {
		match tag.as_str() {
			"OBSERVATION" => Self::Observation,
			"SESSION" => Self::Session,
			"PHOTO" => Self::Photo,
			"OTHER" => Self::Other,
			_ => Self::Unrecognized(tag),
		}
	}
}

impl From<Entity> for String {
	fn from(entity: Entity) -> Self {
		match entity {
			Entity::Unrecognized(tag) => tag,
			known => known.as_str().to_string(),
		}
	}
}

impl fmt::Display for Entity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A mutation recorded while offline, waiting to be delivered to the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
	pub id: ChangeId,
	#[serde(rename = "type")]
	pub kind: ChangeKind,
	pub entity: Entity,
	pub data: Value,
	pub timestamp: DateTime<Utc>,
	#[serde(default)]
	pub attempts: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
}

impl PendingChange {
	#[must_use]
	pub fn new(kind: ChangeKind, entity: Entity, data: Value) -> Self {
		Self {
			id: ChangeId::generate(),
			kind,
			entity,
			data,
			timestamp: Utc::now(),
			attempts: 0,
			last_error: None,
		}
	}

	#[must_use]
	pub const fn has_exhausted_retries(&self) -> bool {
		self.attempts >= MAX_RETRY_ATTEMPTS
	}

	#[must_use]
	pub const fn is_eligible(&self) -> bool {
		!self.has_exhausted_retries()
	}

	pub(crate) fn record_failure(&mut self, error: Option<String>) {
		self.attempts = self.attempts.saturating_add(1);
		if let Some(error) = error {
			self.last_error = Some(error);
		}
	}
}

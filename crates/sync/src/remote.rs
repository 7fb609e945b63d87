use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	change::{ChangeKind, Entity, PendingChange},
	error::{DispatchError, RemoteError},
};

/// REST collections the sync core writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
	Observation,
	Session,
	Photo,
}

impl Resource {
	#[must_use]
	pub const fn collection(self) -> &'static str {
		match self {
			Self::Observation => "observations",
			Self::Session => "sessions",
			Self::Photo => "photos",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoFile {
	/// Local path of the image, optionally prefixed with `file://`.
	pub uri: String,
	pub name: String,
	#[serde(rename = "type")]
	pub content_type: String,
}

/// Body of a queued photo upload, sent as a multipart form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
	pub file: PhotoFile,
	pub entity_type: String,
	pub entity_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub caption: Option<String>,
}

/// One logical request against the remote API.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall<'change> {
	Create {
		resource: Resource,
		body: &'change Value,
	},
	Update {
		resource: Resource,
		id: String,
		body: &'change Value,
	},
	Delete {
		resource: Resource,
		id: String,
	},
	UploadPhoto(PhotoUpload),
}

impl<'change> RemoteCall<'change> {
	/// Maps a pending change onto the request that delivers it.
	pub fn for_change(change: &'change PendingChange) -> Result<Self, DispatchError> {
		let resource = match &change.entity {
			Entity::Observation => Resource::Observation,
			Entity::Session => Resource::Session,
			Entity::Photo => Resource::Photo,
			Entity::Other | Entity::Unrecognized(_) => {
				return Err(DispatchError::UnknownEntity(change.entity.to_string()))
			}
		};

		match (resource, &change.kind) {
			(_, ChangeKind::Unrecognized(kind)) => Err(DispatchError::UnknownKind(kind.clone())),

			(Resource::Photo, ChangeKind::Create) => serde_json::from_value(change.data.clone())
				.map(Self::UploadPhoto)
				.map_err(|e| RemoteError::InvalidPayload(e.to_string()).into()),

			(Resource::Photo, ChangeKind::Update) => Err(DispatchError::Unsupported {
				entity: change.entity.clone(),
				kind: change.kind.clone(),
			}),

			(resource, ChangeKind::Create) => Ok(Self::Create {
				resource,
				body: &change.data,
			}),

			(resource, ChangeKind::Update) => Ok(Self::Update {
				resource,
				id: payload_id(change)?,
				body: &change.data,
			}),

			(resource, ChangeKind::Delete) => Ok(Self::Delete {
				resource,
				id: payload_id(change)?,
			}),
		}
	}

	#[must_use]
	pub const fn method(&self) -> &'static str {
		match self {
			Self::Create { .. } | Self::UploadPhoto(_) => "POST",
			Self::Update { .. } => "PUT",
			Self::Delete { .. } => "DELETE",
		}
	}

	/// Path relative to the API base url, always starting with `/`.
	#[must_use]
	pub fn path(&self) -> String {
		match self {
			Self::Create { resource, .. } => format!("/{}", resource.collection()),
			Self::Update { resource, id, .. } | Self::Delete { resource, id } => {
				format!("/{}/{id}", resource.collection())
			}
			Self::UploadPhoto(_) => "/photos/upload".to_string(),
		}
	}
}

impl fmt::Display for RemoteCall<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.method(), self.path())
	}
}

fn payload_id(change: &PendingChange) -> Result<String, DispatchError> {
	match change.data.get("id") {
		Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
		Some(Value::Number(id)) => Ok(id.to_string()),
		_ => Err(DispatchError::MissingId {
			entity: change.entity.clone(),
		}),
	}
}

/// The remote REST backend, as seen by the synchronizer.
#[async_trait]
pub trait RemoteApi: Send + Sync {
	/// Performs the call; any non-success outcome, including timeouts, is an error.
	async fn execute(&self, call: RemoteCall<'_>) -> Result<(), RemoteError>;

	/// Liveness probe against `GET /health`.
	async fn check_health(&self) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn pending(kind: ChangeKind, entity: Entity, data: Value) -> PendingChange {
		PendingChange::new(kind, entity, data)
	}

	#[test]
	fn routes_every_supported_combination() {
		let cases = [
			(ChangeKind::Create, Entity::Observation, "POST /observations"),
			(ChangeKind::Update, Entity::Observation, "PUT /observations/o-1"),
			(ChangeKind::Delete, Entity::Observation, "DELETE /observations/o-1"),
			(ChangeKind::Create, Entity::Session, "POST /sessions"),
			(ChangeKind::Update, Entity::Session, "PUT /sessions/o-1"),
			(ChangeKind::Delete, Entity::Session, "DELETE /sessions/o-1"),
			(ChangeKind::Delete, Entity::Photo, "DELETE /photos/o-1"),
		];

		for (kind, entity, expected) in cases {
			let change = pending(kind, entity, json!({ "id": "o-1" }));
			let call = RemoteCall::for_change(&change).unwrap();
			assert_eq!(call.to_string(), expected);
		}
	}

	#[test]
	fn photo_create_becomes_an_upload() {
		let change = pending(
			ChangeKind::Create,
			Entity::Photo,
			json!({
				"file": { "uri": "file:///tmp/leaf.jpg", "name": "leaf.jpg", "type": "image/jpeg" },
				"entityType": "OBSERVATION",
				"entityId": "o-9"
			}),
		);

		let RemoteCall::UploadPhoto(upload) = RemoteCall::for_change(&change).unwrap() else {
			panic!("expected an upload");
		};

		assert_eq!(upload.file.name, "leaf.jpg");
		assert_eq!(upload.entity_type, "OBSERVATION");
		assert_eq!(upload.entity_id, "o-9");
		assert_eq!(upload.caption, None);
	}

	#[test]
	fn numeric_ids_are_accepted() {
		let change = pending(ChangeKind::Delete, Entity::Session, json!({ "id": 42 }));
		assert_eq!(
			RemoteCall::for_change(&change).unwrap().path(),
			"/sessions/42"
		);
	}

	#[test]
	fn rejects_what_the_backend_cannot_take() {
		let photo_update = pending(ChangeKind::Update, Entity::Photo, json!({ "id": "p" }));
		assert!(matches!(
			RemoteCall::for_change(&photo_update),
			Err(DispatchError::Unsupported { .. })
		));

		let other = pending(ChangeKind::Create, Entity::Other, json!({}));
		let err = RemoteCall::for_change(&other).unwrap_err();
		assert_eq!(err.to_string(), "Unknown entity type: OTHER");

		let patch = pending(
			ChangeKind::Unrecognized("PATCH".to_string()),
			Entity::Session,
			json!({ "id": "s-1" }),
		);
		let err = RemoteCall::for_change(&patch).unwrap_err();
		assert_eq!(err.to_string(), "Unknown change type: PATCH");

		let missing_id = pending(ChangeKind::Update, Entity::Observation, json!({}));
		assert!(matches!(
			RemoteCall::for_change(&missing_id),
			Err(DispatchError::MissingId { .. })
		));

		let bad_upload = pending(ChangeKind::Create, Entity::Photo, json!({ "file": 3 }));
		assert!(matches!(
			RemoteCall::for_change(&bad_upload),
			Err(DispatchError::Remote(RemoteError::InvalidPayload(_)))
		));
	}
}

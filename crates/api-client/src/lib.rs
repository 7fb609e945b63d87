use std::{path::Path, time::Duration};

use async_trait::async_trait;
use ps_sync::{FileIOError, PhotoUpload, RemoteApi, RemoteCall, RemoteError};
use reqwest::{
	multipart::{Form, Part},
	RequestBuilder, Response, StatusCode,
};
use tokio::fs;
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
#[error("failed to build HTTP client: {0}")]
pub struct BuildError(#[from] reqwest::Error);

#[derive(Debug, Clone)]
pub struct RequestConfig {
	pub api_url: String,
	pub request_timeout: Duration,
	pub health_timeout: Duration,
	/// Bearer token handed over by the auth layer, if the user is signed in.
	pub auth_token: Option<String>,
}

impl Default for RequestConfig {
	fn default() -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			health_timeout: DEFAULT_HEALTH_TIMEOUT,
			auth_token: None,
		}
	}
}

trait WithAuth {
	fn with_auth(self, token: Option<&str>) -> Self;
}

impl WithAuth for RequestBuilder {
	fn with_auth(self, token: Option<&str>) -> Self {
		match token {
			Some(token) => self.bearer_auth(token),
			None => self,
		}
	}
}

/// [`RemoteApi`] over the PestScan REST backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
	client: reqwest::Client,
	api_url: String,
	health_timeout: Duration,
	auth_token: Option<String>,
}

impl ApiClient {
	pub fn new(config: RequestConfig) -> Result<Self, BuildError> {
		let client = reqwest::Client::builder()
			.timeout(config.request_timeout)
			.build()?;

		Ok(Self {
			client,
			api_url: config.api_url.trim_end_matches('/').to_string(),
			health_timeout: config.health_timeout,
			auth_token: config.auth_token,
		})
	}

	#[must_use]
	pub fn api_url(&self) -> &str {
		&self.api_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.api_url)
	}

	async fn upload_form(upload: &PhotoUpload) -> Result<Form, RemoteError> {
		let path = upload
			.file
			.uri
			.strip_prefix("file://")
			.unwrap_or(&upload.file.uri);

		let bytes = fs::read(path).await.map_err(|e| {
			FileIOError::from((Path::new(path), e, "Failed to read photo for upload"))
		})?;

		let file = Part::bytes(bytes)
			.file_name(upload.file.name.clone())
			.mime_str(&upload.file.content_type)
			.map_err(|e| RemoteError::InvalidPayload(e.to_string()))?;

		let form = Form::new()
			.part("file", file)
			.text("entityType", upload.entity_type.clone())
			.text("entityId", upload.entity_id.clone());

		Ok(match &upload.caption {
			Some(caption) => form.text("caption", caption.clone()),
			None => form,
		})
	}
}

fn send_error(e: reqwest::Error) -> RemoteError {
	if e.is_timeout() {
		RemoteError::Timeout
	} else {
		RemoteError::Network(e.to_string())
	}
}

async fn ensure_success(response: Response) -> Result<(), RemoteError> {
	let status = response.status();
	if status.is_success() {
		return Ok(());
	}

	let body = response.text().await.unwrap_or_default();
	Err(RemoteError::Http {
		status: status.as_u16(),
		body,
	})
}

#[async_trait]
impl RemoteApi for ApiClient {
	#[instrument(skip_all, fields(call = %call))]
	async fn execute(&self, call: RemoteCall<'_>) -> Result<(), RemoteError> {
		let url = self.url(&call.path());

		let request = match &call {
			RemoteCall::Create { body, .. } => self.client.post(&url).json(body),
			RemoteCall::Update { body, .. } => self.client.put(&url).json(body),
			RemoteCall::Delete { .. } => self.client.delete(&url),
			RemoteCall::UploadPhoto(upload) => {
				self.client.post(&url).multipart(Self::upload_form(upload).await?)
			}
		};

		let response = request
			.with_auth(self.auth_token.as_deref())
			.send()
			.await
			.map_err(send_error)?;

		debug!(status = %response.status(), "Remote call answered");

		ensure_success(response).await
	}

	async fn check_health(&self) -> Result<(), RemoteError> {
		let response = self
			.client
			.get(self.url("/health"))
			.timeout(self.health_timeout)
			.with_auth(self.auth_token.as_deref())
			.send()
			.await
			.map_err(send_error)?;

		match response.status() {
			StatusCode::OK => Ok(()),
			status => Err(RemoteError::Http {
				status: status.as_u16(),
				body: response.text().await.unwrap_or_default(),
			}),
		}
	}
}

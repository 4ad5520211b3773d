//! Cloudinary client: unsigned preset uploads plus deletes through the relay.

use super::{MediaHost, MediaUpload, UploadedMedia};
use crate::{
    config::{join_url, AppConfig},
    error::{describe_transport_error, UploadError},
    relay::DELETE_MEDIA_PATH,
    BoxFuture, APP_USER_AGENT,
};
use anyhow::{anyhow, Result};
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Uploads can be large; allow longer than the default API timeout.
const UPLOAD_TIMEOUT_SECS: u64 = 120;
/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

pub struct CloudinaryClient {
    client: Client,
    upload_url: String,
    upload_preset: String,
    delete_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryClient {
    /// # Errors
    /// Returns an error if the cloud name or upload preset is missing, or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self> {
        if config.media_cloud_name.is_empty() {
            return Err(anyhow!("missing media cloud name (ATRIUM_MEDIA_CLOUD_NAME)"));
        }
        if config.media_upload_preset.is_empty() {
            return Err(anyhow!("missing upload preset (ATRIUM_MEDIA_UPLOAD_PRESET)"));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            upload_url: join_url(
                &config.media_upload_base_url,
                &format!("/v1_1/{}/upload", config.media_cloud_name),
            ),
            upload_preset: config.media_upload_preset.clone(),
            delete_url: join_url(&config.relay_base_url, DELETE_MEDIA_PATH),
        })
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn send_upload(&self, file: &MediaUpload) -> Result<UploadedMedia, UploadError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|err| UploadError::InvalidResponse(format!("invalid content type: {err}")))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Network(describe_transport_error(&err)))?;
        let response = ensure_success(response).await?;

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|err| UploadError::InvalidResponse(err.to_string()))?;
        debug!(public_id = %uploaded.public_id, "upload complete");

        Ok(UploadedMedia {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    #[instrument(skip(self))]
    async fn send_delete(&self, public_id: &str) -> Result<(), UploadError> {
        let response = self
            .client
            .post(&self.delete_url)
            .json(&json!({ "publicId": public_id }))
            .send()
            .await
            .map_err(|err| UploadError::Network(describe_transport_error(&err)))?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Turns non-2xx replies into `Rejected`, preferring the JSON `error` message.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, UploadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|value| {
        value["error"]["message"]
            .as_str()
            .or_else(|| value["error"].as_str())
            .map(ToString::to_string)
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        "Request failed.".to_string()
    } else {
        message.chars().take(MAX_ERROR_CHARS).collect()
    }
}

impl MediaHost for CloudinaryClient {
    fn upload<'a>(
        &'a self,
        file: &'a MediaUpload,
    ) -> BoxFuture<'a, Result<UploadedMedia, UploadError>> {
        Box::pin(self.send_upload(file))
    }

    fn delete<'a>(&'a self, public_id: &'a str) -> BoxFuture<'a, Result<(), UploadError>> {
        Box::pin(self.send_delete(public_id))
    }
}

//! Signed-side CDN access: the only place the API secret is used.

use crate::{
    config::join_url,
    error::{describe_transport_error, UploadError},
    media::cloudinary::ensure_success,
    BoxFuture, APP_USER_AGENT,
};
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Admin API requests are small; keep the client timeout short.
const ADMIN_TIMEOUT_SECS: u64 = 10;

/// Privileged media operations performed on behalf of clients.
pub trait MediaAdmin: Send + Sync {
    /// Destroys the asset and returns the host's reply.
    fn destroy<'a>(&'a self, public_id: &'a str) -> BoxFuture<'a, Result<Value, UploadError>>;
}

pub struct CloudinaryAdmin {
    client: Client,
    resources_url: String,
    api_key: String,
    api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryAdmin")
            .field("resources_url", &self.resources_url)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl CloudinaryAdmin {
    /// # Errors
    /// Returns an error if a credential is missing or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        cloud_name: &str,
        api_key: String,
        api_secret: SecretString,
    ) -> Result<Self> {
        if cloud_name.trim().is_empty() {
            return Err(anyhow!("missing cloud name"));
        }
        if api_key.trim().is_empty() || api_secret.expose_secret().is_empty() {
            return Err(anyhow!("missing API credentials"));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(ADMIN_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            resources_url: join_url(
                base_url,
                &format!("/v1_1/{}/resources/image/upload", cloud_name.trim()),
            ),
            api_key,
            api_secret,
        })
    }

    #[instrument(skip(self))]
    async fn delete_resource(&self, public_id: &str) -> Result<Value, UploadError> {
        let response = self
            .client
            .delete(&self.resources_url)
            .query(&[("public_ids[]", public_id)])
            .basic_auth(&self.api_key, Some(self.api_secret.expose_secret()))
            .send()
            .await
            .map_err(|err| UploadError::Network(describe_transport_error(&err)))?;
        let response = ensure_success(response).await?;

        let result: Value = response
            .json()
            .await
            .map_err(|err| UploadError::InvalidResponse(err.to_string()))?;
        debug!(?result, "resource deleted");
        Ok(result)
    }
}

impl MediaAdmin for CloudinaryAdmin {
    fn destroy<'a>(&'a self, public_id: &'a str) -> BoxFuture<'a, Result<Value, UploadError>> {
        Box::pin(self.delete_resource(public_id))
    }
}

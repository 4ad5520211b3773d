//! Identity Toolkit REST client (the hosted Firebase Auth backend).
//!
//! The browser SDK keeps the signed-in user locally and fires auth-state events
//! on sign-in/out; this client does the same through [`AuthStateBroadcaster`].
//! Tokens are held in memory only and never logged.

use super::{
    AuthEvents, AuthStateBroadcaster, Credentials, Identity, IdentityProvider, ProfileFields,
    SocialPopup, SocialProvider,
};
use crate::{
    config::{join_url, AppConfig},
    error::{describe_transport_error, AuthError},
    BoxFuture, APP_USER_AGENT,
};
use anyhow::Result;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Request timeout applied to every Identity Toolkit call.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

struct SignedIn {
    id_token: SecretString,
    identity: Identity,
}

pub struct FirebaseAuth {
    client: Client,
    base_url: String,
    api_key: String,
    request_uri: String,
    popup: Option<Arc<dyn SocialPopup>>,
    session: Mutex<Option<SignedIn>>,
    broadcaster: AuthStateBroadcaster,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

/// Subset of the account payload shared by the sign-up, sign-in and update
/// endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
}

impl AccountResponse {
    fn identity(&self) -> Identity {
        Identity {
            uid: self.local_id.clone(),
            display_name: non_empty(self.display_name.as_deref()),
            photo_url: non_empty(self.photo_url.as_deref()),
            email: non_empty(self.email.as_deref()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Maps an Identity Toolkit error message (`"WEAK_PASSWORD : Password should..."`)
/// onto the app's error taxonomy.
pub(crate) fn map_error_code(message: &str) -> AuthError {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => {
            AuthError::InvalidCredential
        }
        "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
        "EMAIL_EXISTS" => AuthError::EmailInUse,
        "WEAK_PASSWORD" => AuthError::WeakPassword,
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            AuthError::NotSignedIn
        }
        "" => AuthError::Provider {
            code: "UNKNOWN".to_string(),
        },
        other => AuthError::Provider {
            code: other.to_string(),
        },
    }
}

impl FirebaseAuth {
    /// Builds the client from app configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.identity_base_url.clone(),
            api_key: config.identity_api_key.clone(),
            request_uri: config.auth_redirect_uri.clone(),
            popup: None,
            session: Mutex::new(None),
            broadcaster: AuthStateBroadcaster::default(),
        })
    }

    /// Enables social login through the given interactive flow.
    #[must_use]
    pub fn with_popup(mut self, popup: Arc<dyn SocialPopup>) -> Self {
        self.popup = Some(popup);
        self
    }

    fn session(&self) -> MutexGuard<'_, Option<SignedIn>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, method: &str) -> String {
        join_url(&self.base_url, &format!("/v1/accounts:{method}"))
    }

    /// Posts a JSON body to an Identity Toolkit method and decodes the reply.
    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let url = self.endpoint(method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|err| AuthError::Network(describe_transport_error(&err)))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|err| {
                warn!("Failed to decode {method} response: {err}");
                AuthError::Provider {
                    code: "INVALID_RESPONSE".to_string(),
                }
            });
        }

        let body: Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"].as_str().unwrap_or_default();
        debug!("{method} failed with {status}: {message}");
        Err(map_error_code(message))
    }

    fn establish(&self, account: &AccountResponse) -> Result<Identity, AuthError> {
        let id_token = account.id_token.clone().ok_or_else(|| AuthError::Provider {
            code: "MISSING_ID_TOKEN".to_string(),
        })?;
        let identity = account.identity();
        *self.session() = Some(SignedIn {
            id_token: SecretString::from(id_token),
            identity: identity.clone(),
        });
        self.broadcaster.publish(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip_all)]
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let request = PasswordRequest {
            email: credentials.email.trim(),
            password: credentials.password.expose_secret(),
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signUp", &request).await?;
        self.establish(&account)
    }

    #[instrument(skip_all)]
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let request = PasswordRequest {
            email: credentials.email.trim(),
            password: credentials.password.expose_secret(),
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signInWithPassword", &request).await?;
        self.establish(&account)
    }

    #[instrument(skip(self))]
    async fn sign_in_idp(&self, provider: SocialProvider) -> Result<Identity, AuthError> {
        let popup = self.popup.as_ref().ok_or_else(|| AuthError::Provider {
            code: "OPERATION_NOT_ALLOWED".to_string(),
        })?;
        let credential = popup
            .authorize(provider)
            .await?
            .ok_or(AuthError::PopupClosed)?;

        let post_body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id_token", credential.id_token.expose_secret())
            .append_pair("providerId", provider.provider_id())
            .finish();
        let request = IdpRequest {
            post_body,
            request_uri: &self.request_uri,
            return_idp_credential: true,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signInWithIdp", &request).await?;
        self.establish(&account)
    }

    #[instrument(skip_all)]
    async fn reset(&self, email: &str) -> Result<(), AuthError> {
        let request = OobRequest {
            request_type: "PASSWORD_RESET",
            email: email.trim(),
        };
        let _: Value = self.call("sendOobCode", &request).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn update(&self, fields: &ProfileFields) -> Result<Identity, AuthError> {
        let (id_token, current) = {
            let session = self.session();
            let signed_in = session.as_ref().ok_or(AuthError::NotSignedIn)?;
            (
                signed_in.id_token.expose_secret().to_string(),
                signed_in.identity.clone(),
            )
        };

        let request = UpdateRequest {
            id_token: &id_token,
            display_name: fields.display_name.as_deref(),
            photo_url: fields.photo_url.as_deref(),
            return_secure_token: false,
        };
        let account: AccountResponse = self.call("update", &request).await?;

        // The update reply may omit fields it did not touch.
        let mut updated = current.patched(fields);
        let confirmed = account.identity();
        if confirmed.email.is_some() {
            updated.email = confirmed.email;
        }
        if let Some(signed_in) = self.session().as_mut() {
            signed_in.identity = updated.clone();
        }
        Ok(updated)
    }

    fn clear(&self) {
        *self.session() = None;
        self.broadcaster.publish(None);
    }
}

impl IdentityProvider for FirebaseAuth {
    fn subscribe(&self) -> AuthEvents {
        self.broadcaster.subscribe()
    }

    fn register<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(self.sign_up(credentials))
    }

    fn sign_in_with_password<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(self.sign_in(credentials))
    }

    fn sign_in_with_social(
        &self,
        provider: SocialProvider,
    ) -> BoxFuture<'_, Result<Identity, AuthError>> {
        Box::pin(self.sign_in_idp(provider))
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        // Sessions are client-held; signing out only drops the local tokens.
        Box::pin(async move {
            self.clear();
            Ok(())
        })
    }

    fn send_password_reset<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(self.reset(email))
    }

    fn update_profile<'a>(
        &'a self,
        fields: &'a ProfileFields,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(self.update(fields))
    }
}

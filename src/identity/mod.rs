//! Identity provider seam. The provider owns sessions; everything in this crate
//! only ever holds a cached copy of the [`Identity`] it issues.
//!
//! Providers push session transitions through [`AuthEvents`]. A subscriber
//! receives the current state immediately, then one event per transition
//! (sign-in, sign-out). Profile updates do not produce an event, which is why
//! the session store keeps its own optimistic patch after `update_profile`.

mod broadcast;
pub mod firebase;
pub mod memory;

pub(crate) use broadcast::AuthStateBroadcaster;

use crate::{error::AuthError, BoxFuture};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Stream of session transitions: `Some` when a user is signed in, `None` otherwise.
pub type AuthEvents = mpsc::UnboundedReceiver<Option<Identity>>;

/// Provider-issued user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            photo_url: None,
            email: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Returns a copy with the provided profile fields applied on top.
    #[must_use]
    pub fn patched(&self, fields: &ProfileFields) -> Self {
        let mut identity = self.clone();
        if let Some(name) = &fields.display_name {
            identity.display_name = Some(name.clone());
        }
        if let Some(url) = &fields.photo_url {
            identity.photo_url = Some(url.clone());
        }
        identity
    }
}

/// Email/password pair. The password never shows up in `Debug` output.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Profile fields sent to the provider. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileFields {
    /// Folds a later patch into this one; fields it leaves `None` are kept.
    pub fn merge(&mut self, later: Self) {
        if later.display_name.is_some() {
            self.display_name = later.display_name;
        }
        if later.photo_url.is_some() {
            self.photo_url = later.photo_url;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialProvider {
    Google,
}

impl SocialProvider {
    #[must_use]
    pub const fn provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
        }
    }
}

/// Token handed back by the interactive social sign-in flow.
#[derive(Debug)]
pub struct IdpCredential {
    pub id_token: SecretString,
}

/// Interactive popup/redirect flow for social login. Resolves to `None` when
/// the user dismisses the popup.
pub trait SocialPopup: Send + Sync {
    fn authorize(
        &self,
        provider: SocialProvider,
    ) -> BoxFuture<'_, Result<Option<IdpCredential>, AuthError>>;
}

/// Credential operations plus the session-change subscription.
pub trait IdentityProvider: Send + Sync {
    fn subscribe(&self) -> AuthEvents;

    fn register<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Identity, AuthError>>;

    fn sign_in_with_password<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Identity, AuthError>>;

    fn sign_in_with_social(
        &self,
        provider: SocialProvider,
    ) -> BoxFuture<'_, Result<Identity, AuthError>>;

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;

    fn send_password_reset<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<(), AuthError>>;

    fn update_profile<'a>(
        &'a self,
        fields: &'a ProfileFields,
    ) -> BoxFuture<'a, Result<Identity, AuthError>>;
}

//! In-process identity provider for local development and tests.
//!
//! Accounts live in memory for the lifetime of the provider. Behaviour mirrors
//! the hosted provider where the app depends on it: registration signs the new
//! user in, sign-in/out emit a transition, and profile updates do not.

use super::{
    AuthEvents, AuthStateBroadcaster, Credentials, Identity, IdentityProvider, ProfileFields,
    SocialProvider,
};
use crate::{error::AuthError, BoxFuture};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug)]
struct Account {
    identity: Identity,
    password: String,
}

#[derive(Debug, Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    social: Option<Identity>,
    password_resets: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryAuth {
    accounts: Mutex<Accounts>,
    broadcaster: AuthStateBroadcaster,
}

impl MemoryAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> MutexGuard<'_, Accounts> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an email/password account without signing it in.
    pub fn add_account(&self, identity: Identity, password: &str) {
        let email = identity.email.clone().unwrap_or_default().to_lowercase();
        self.accounts().by_email.insert(
            email,
            Account {
                identity,
                password: password.to_string(),
            },
        );
    }

    /// Account returned by the next social sign-in. `None` behaves like a user
    /// closing the popup.
    pub fn set_social_account(&self, identity: Option<Identity>) {
        self.accounts().social = identity;
    }

    /// Emails that requested a password reset, oldest first.
    #[must_use]
    pub fn password_resets(&self) -> Vec<String> {
        self.accounts().password_resets.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Identity> {
        self.broadcaster.current()
    }

    /// Number of live auth-state subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.listener_count()
    }

    #[instrument(skip_all)]
    async fn create_account(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AuthError::Provider {
                code: "INVALID_EMAIL".to_string(),
            });
        }
        let password = credentials.password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let identity = {
            let mut accounts = self.accounts();
            if accounts.by_email.contains_key(&email) {
                return Err(AuthError::EmailInUse);
            }
            let identity = Identity::new(Uuid::new_v4().simple().to_string()).with_email(&email);
            accounts.by_email.insert(
                email,
                Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                },
            );
            identity
        };

        info!(uid = %identity.uid, "account created");
        self.broadcaster.publish(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip_all)]
    async fn password_sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        let identity = {
            let accounts = self.accounts();
            let account = accounts
                .by_email
                .get(&email)
                .ok_or(AuthError::InvalidCredential)?;
            if account.password != credentials.password.expose_secret() {
                return Err(AuthError::InvalidCredential);
            }
            account.identity.clone()
        };

        debug!(uid = %identity.uid, "password sign-in");
        self.broadcaster.publish(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self))]
    async fn social_sign_in(&self, provider: SocialProvider) -> Result<Identity, AuthError> {
        let identity = self.accounts().social.clone().ok_or(AuthError::PopupClosed)?;
        debug!(uid = %identity.uid, provider = provider.provider_id(), "social sign-in");
        self.broadcaster.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        let mut accounts = self.accounts();
        if !accounts.by_email.contains_key(&email) {
            return Err(AuthError::UserNotFound);
        }
        info!("password reset requested");
        accounts.password_resets.push(email);
        Ok(())
    }

    async fn apply_profile(&self, fields: &ProfileFields) -> Result<Identity, AuthError> {
        let current = self.broadcaster.current().ok_or(AuthError::NotSignedIn)?;
        let updated = current.patched(fields);

        let mut accounts = self.accounts();
        if let Some(account) = accounts
            .by_email
            .values_mut()
            .find(|account| account.identity.uid == updated.uid)
        {
            account.identity = updated.clone();
        }
        if let Some(social) = accounts.social.as_mut().filter(|s| s.uid == updated.uid) {
            *social = updated.clone();
        }
        drop(accounts);
        self.broadcaster.replace_current(updated.clone());
        Ok(updated)
    }
}

impl IdentityProvider for MemoryAuth {
    fn subscribe(&self) -> AuthEvents {
        self.broadcaster.subscribe()
    }

    fn register<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(self.create_account(credentials))
    }

    fn sign_in_with_password<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(self.password_sign_in(credentials))
    }

    fn sign_in_with_social(
        &self,
        provider: SocialProvider,
    ) -> BoxFuture<'_, Result<Identity, AuthError>> {
        Box::pin(self.social_sign_in(provider))
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            self.broadcaster.publish(None);
            Ok(())
        })
    }

    fn send_password_reset<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(self.reset_password(email))
    }

    fn update_profile<'a>(
        &'a self,
        fields: &'a ProfileFields,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(self.apply_profile(fields))
    }
}

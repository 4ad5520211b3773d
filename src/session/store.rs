use super::state::{SessionSnapshot, Transition};
use crate::{
    error::AuthError,
    identity::{AuthEvents, Credentials, Identity, IdentityProvider, ProfileFields, SocialProvider},
    media::{MediaHost, MediaUpload},
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, instrument};

/// New avatar for a profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// Leave the current photo as it is.
    Keep,
    /// Use an already hosted image.
    Url(String),
    /// Upload this file to the media host first.
    Image(MediaUpload),
}

/// Owns the only identity-provider subscription in the process.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    media: Arc<dyn MediaHost>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

fn commit(state: &watch::Sender<SessionSnapshot>, transition: Transition) {
    state.send_if_modified(|snapshot| snapshot.apply(transition));
}

async fn listen(mut events: AuthEvents, state: Arc<watch::Sender<SessionSnapshot>>) {
    while let Some(identity) = events.recv().await {
        match &identity {
            Some(identity) => info!(uid = %identity.uid, "session established"),
            None => info!("no active session"),
        }
        commit(&state, Transition::Notified(identity));
    }
    debug!("identity provider closed the session stream");
}

impl SessionStore {
    /// Subscribes to `provider` and starts listening for session changes.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn init(provider: Arc<dyn IdentityProvider>, media: Arc<dyn MediaHost>) -> Self {
        let state = Arc::new(watch::Sender::new(SessionSnapshot::default()));
        let events = provider.subscribe();
        let listener = tokio::spawn(listen(events, Arc::clone(&state)));

        Self {
            provider,
            media,
            state,
            listener: Mutex::new(Some(listener)),
        }
    }

    fn apply(&self, transition: Transition) {
        commit(&self.state, transition);
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().current_identity()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Waits until the session satisfies `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let mut rx = self.state.subscribe();
        let result = rx.wait_for(predicate).await.map(|snapshot| snapshot.clone());
        result.unwrap_or_else(|_| self.snapshot())
    }

    /// Creates an account. The provider signs the new user in and notifies.
    ///
    /// # Errors
    /// Returns the provider's `AuthError`.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let credentials = Credentials::new(email, password);
        self.provider.register(&credentials).await
    }

    /// # Errors
    /// Returns the provider's `AuthError`.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        self.provider.sign_in_with_password(credentials).await
    }

    /// # Errors
    /// Returns `AuthError::PopupClosed` when the user dismissed the popup.
    #[instrument(skip(self))]
    pub async fn login_with_social_provider(
        &self,
        provider: SocialProvider,
    ) -> Result<Identity, AuthError> {
        self.provider.sign_in_with_social(provider).await
    }

    /// # Errors
    /// Returns the provider's `AuthError`.
    #[instrument(skip(self))]
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.provider.send_password_reset(email).await
    }

    /// Clears the cached session right away, then signs out at the provider.
    ///
    /// # Errors
    /// Returns the provider's `AuthError`; the local session is cleared regardless.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.apply(Transition::LoggedOut);
        self.provider.sign_out().await
    }

    /// Updates the display name and photo of the signed-in user.
    ///
    /// # Errors
    /// * `AuthError::NotSignedIn` without a session.
    /// * `AuthError::MediaUpload` when the image upload fails; the provider is
    ///   not called.
    /// * The provider's `AuthError` when the update is rejected. An image
    ///   uploaded before that stays on the media host.
    #[instrument(skip(self, photo))]
    pub async fn update_profile(
        &self,
        display_name: Option<String>,
        photo: PhotoSource,
    ) -> Result<Identity, AuthError> {
        let identity = self.current_identity().ok_or(AuthError::NotSignedIn)?;

        let photo_url = match photo {
            PhotoSource::Keep => None,
            PhotoSource::Url(url) => Some(url),
            PhotoSource::Image(upload) => {
                let uploaded = self.media.upload(&upload).await?;
                debug!(public_id = %uploaded.public_id, "profile photo uploaded");
                Some(uploaded.secure_url)
            }
        };

        let fields = ProfileFields {
            display_name,
            photo_url,
        };
        let confirmed = self.provider.update_profile(&fields).await?;

        self.apply(Transition::ProfileConfirmed {
            uid: identity.uid,
            patch: fields.clone(),
        });
        Ok(confirmed.patched(&fields))
    }

    /// Whether the listener task is still running.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the listener and drops the provider subscription.
    pub fn teardown(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("session listener stopped");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Some(handle) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

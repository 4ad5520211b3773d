use crate::identity::{Identity, ProfileFields};

/// Optimistic profile patch recorded after the provider accepted an update.
pub type ProfilePatch = ProfileFields;

/// Point-in-time view of the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Last identity reported by the provider, `None` when signed out.
    pub identity: Option<Identity>,
    /// True until the provider delivered its first notification.
    pub loading: bool,
    pub profile_override: Option<ProfilePatch>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            identity: None,
            loading: true,
            profile_override: None,
        }
    }
}

impl SessionSnapshot {
    /// Cached identity with the local profile patch applied.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.as_ref().map(|identity| match &self.profile_override {
            Some(patch) => identity.patched(patch),
            None => identity.clone(),
        })
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Applies `transition` and reports whether anything changed.
    pub(crate) fn apply(&mut self, transition: Transition) -> bool {
        let before = self.clone();
        match transition {
            Transition::Notified(identity) => {
                self.identity = identity;
                self.loading = false;
                self.profile_override = None;
            }
            Transition::LoggedOut => {
                self.identity = None;
                self.profile_override = None;
            }
            Transition::ProfileConfirmed { uid, patch } => {
                // A sign-out or account switch raced the update.
                if self.identity.as_ref().is_some_and(|identity| identity.uid == uid) {
                    let merged = match self.profile_override.take() {
                        Some(mut previous) => {
                            previous.merge(patch);
                            previous
                        }
                        None => patch,
                    };
                    self.profile_override = Some(merged);
                }
            }
        }
        *self != before
    }
}

/// Every way the session state can move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    /// The provider reported the current session.
    Notified(Option<Identity>),
    /// Local logout, ahead of the provider's own notification.
    LoggedOut,
    ProfileConfirmed { uid: String, patch: ProfilePatch },
}

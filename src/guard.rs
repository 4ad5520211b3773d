//! Access decision for guarded routes.
//!
//! Guarding is a navigation concern only. The backends enforce their own
//! access rules whatever the client decides here.

use crate::{identity::Identity, routes::Route, session::SessionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session has not been resolved yet; render a loading indicator.
    Pending,
    /// Render the protected view for this identity.
    Allow(Identity),
    /// Send the user elsewhere. The attempted destination is not kept.
    Redirect(Route),
}

/// Decides whether a protected view may render for `snapshot`.
#[must_use]
pub fn evaluate(snapshot: &SessionSnapshot) -> GuardDecision {
    if snapshot.loading {
        return GuardDecision::Pending;
    }
    match snapshot.current_identity() {
        Some(identity) => GuardDecision::Allow(identity),
        None => GuardDecision::Redirect(Route::Login),
    }
}

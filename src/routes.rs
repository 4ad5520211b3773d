//! Route table and path resolution.

use crate::{
    guard::{self, GuardDecision},
    identity::Identity,
    session::SessionSnapshot,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    ForgotPassword,
    Home,
    Profile,
    Chat,
    Todo,
    Files,
    NotFound,
}

impl Route {
    pub const ALL: [Self; 9] = [
        Self::Login,
        Self::Register,
        Self::ForgotPassword,
        Self::Home,
        Self::Profile,
        Self::Chat,
        Self::Todo,
        Self::Files,
        Self::NotFound,
    ];

    /// Canonical path. `NotFound` has none of its own and reports `*`.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::ForgotPassword => "/forgot-password",
            Self::Home => "/",
            Self::Profile => "/profile",
            Self::Chat => "/chat",
            Self::Todo => "/todo",
            Self::Files => "/files",
            Self::NotFound => "*",
        }
    }

    #[must_use]
    pub const fn is_guarded(self) -> bool {
        matches!(
            self,
            Self::Home | Self::Profile | Self::Chat | Self::Todo | Self::Files
        )
    }

    /// Resolves a browser path, ignoring query, fragment and trailing slashes.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL
            .into_iter()
            .find(|route| *route != Self::NotFound && route.path() == normalized)
            .unwrap_or(Self::NotFound)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of navigating to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Render `route`; `identity` is set for guarded routes.
    Render {
        route: Route,
        identity: Option<Identity>,
    },
    /// The guard has not decided yet.
    Loading(Route),
    Redirect(Route),
}

/// Resolves `path` and applies the guard when the route is protected.
#[must_use]
pub fn navigate(path: &str, snapshot: &SessionSnapshot) -> Navigation {
    let route = Route::parse(path);
    if !route.is_guarded() {
        return Navigation::Render {
            route,
            identity: None,
        };
    }
    match guard::evaluate(snapshot) {
        GuardDecision::Pending => Navigation::Loading(route),
        GuardDecision::Allow(identity) => Navigation::Render {
            route,
            identity: Some(identity),
        },
        GuardDecision::Redirect(target) => Navigation::Redirect(target),
    }
}

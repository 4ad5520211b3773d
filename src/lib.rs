//! # Atrium (client session layer)
//!
//! `atrium` is the state layer of a small social app whose persistence and
//! identity live in managed backends: an identity provider, a document store,
//! a realtime key-value store and an image CDN.
//!
//! ## Session lifecycle
//!
//! A single [`session::SessionStore`] subscribes once to the identity
//! provider and caches the last known [`identity::Identity`]. The store starts
//! in a *loading* state and leaves it on the first provider notification; it
//! never returns to it. Consumers read snapshots; they never subscribe to the
//! provider themselves.
//!
//! ## Route guarding
//!
//! [`guard::evaluate`] maps a snapshot to *pending*, *allow* or *redirect to
//! login*. [`routes::navigate`] applies it to the guarded routes. Guarding is a
//! UX concern only; the backends enforce their own access rules.
//!
//! ## Feature views
//!
//! [`features`] holds the view-models for the profile editor, chat room, to-do
//! list and file gallery. Each owns its store subscription for as long as the
//! view is open.
//!
//! ## Media relay
//!
//! [`relay`] is a small axum server that holds the CDN API secret and deletes
//! uploaded media on behalf of the client.

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod guard;
pub mod identity;
pub mod media;
pub mod relay;
pub mod routes;
pub mod session;
pub mod shell;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Boxed future returned by the collaborator traits so they stay object safe.
pub use futures::future::BoxFuture;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

//! View-models for the app's pages.
//!
//! Each view reads the signed-in identity from the [`SessionStore`] when it
//! opens and talks to its backing store directly. Views that hold a live
//! subscription release it on `close` or when dropped.
//!
//! [`SessionStore`]: crate::session::SessionStore

pub mod auth;
pub mod chat;
pub mod files;
pub mod profile;
pub mod todo;
pub mod welcome;

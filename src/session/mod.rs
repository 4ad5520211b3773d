//! Process-wide session store.
//!
//! The store subscribes once to the identity provider and keeps the last
//! reported identity in a `watch` channel. Guards, the navigation shell and
//! feature views read snapshots from it; none of them talk to the provider's
//! subscription directly.

mod state;
mod store;

pub use state::{ProfilePatch, SessionSnapshot};
pub use store::{PhotoSource, SessionStore};

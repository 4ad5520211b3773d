//! Document and key-value store seams used by the feature views, plus the
//! in-process backends that stand in for the hosted services locally.
//!
//! Both stores push full result sets: a live query re-delivers the whole
//! ordered list on every change and a key-value subscription re-delivers the
//! whole subtree. Views never diff; they replace what they render.

pub mod document;
pub mod kv;
pub mod memory;

pub use document::{Document, DocumentStore, FieldFilter, LiveQuery, Query, QueryState, SortOrder};
pub use kv::{KeyValueStore, KvSubscription};

//! Shared chat room backed by the `messages` collection.

use crate::{
    error::QueryError,
    identity::Identity,
    store::{DocumentStore, LiveQuery, Query, QueryState, SortOrder},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const COLLECTION: &str = "messages";
const ANONYMOUS: &str = "Anonymous";

/// Message body as stored; `createdAt` comes from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub text: String,
    pub uid: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

impl MessageRecord {
    #[must_use]
    pub fn from_sender(identity: &Identity, text: &str) -> Self {
        Self {
            text: text.to_string(),
            uid: identity.uid.clone(),
            display_name: identity
                .display_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            photo_url: identity.photo_url.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub record: MessageRecord,
}

impl ChatMessage {
    /// Whether the message was sent by `identity`; the UI aligns those right.
    #[must_use]
    pub fn is_from(&self, identity: &Identity) -> bool {
        self.record.uid == identity.uid
    }

    /// Avatar to show next to the message, if the sender had one.
    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        Some(self.record.photo_url.as_str()).filter(|url| !url.is_empty())
    }
}

pub struct ChatRoom {
    store: Arc<dyn DocumentStore>,
    sender: Identity,
    live: Option<LiveQuery>,
}

impl ChatRoom {
    /// Opens the room for `sender`, oldest message first.
    #[must_use]
    pub fn open(store: Arc<dyn DocumentStore>, sender: Identity) -> Self {
        let live = store.query(Query::collection(COLLECTION).order_by_created(SortOrder::Ascending));
        Self {
            store,
            sender,
            live: Some(live),
        }
    }

    /// Current message list. Records that fail to decode are skipped.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        let Some(QueryState::Ready(documents)) = self.live.as_ref().map(LiveQuery::current) else {
            return Vec::new();
        };
        documents
            .iter()
            .filter_map(|document| match document.decode::<MessageRecord>() {
                Ok(record) => Some(ChatMessage {
                    id: document.id.clone(),
                    created_at: document.created_at,
                    record,
                }),
                Err(err) => {
                    warn!(id = %document.id, "skipping malformed message: {err}");
                    None
                }
            })
            .collect()
    }

    /// Waits for the next delivery. Returns `false` once the room is closed.
    pub async fn changed(&mut self) -> bool {
        match self.live.as_mut() {
            Some(live) => live.changed().await,
            None => false,
        }
    }

    /// Posts `text` as the current user. Blank input is ignored.
    ///
    /// # Errors
    /// Returns the store error when the write is rejected.
    pub async fn send(&self, text: &str) -> Result<Option<String>, QueryError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let record = MessageRecord::from_sender(&self.sender, text);
        let id = self
            .store
            .add(COLLECTION, serde_json::to_value(&record)?)
            .await?;
        debug!(id = %id, "message sent");
        Ok(Some(id))
    }

    /// Ends the subscription.
    pub fn close(&mut self) {
        self.live = None;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.live.is_some()
    }
}

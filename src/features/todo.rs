//! Per-user to-do list stored under `todos/{uid}` in the key-value store.

use crate::{
    error::QueryError,
    store::{KeyValueStore, KvSubscription},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// Turns a subtree snapshot into items in creation order. Push keys sort by
/// creation time, so key order is creation order.
fn items_from(snapshot: Option<&Value>) -> Vec<TodoItem> {
    let Some(Value::Object(entries)) = snapshot else {
        return Vec::new();
    };
    let mut items: Vec<TodoItem> = entries
        .iter()
        .filter_map(|(id, value)| match serde_json::from_value::<TodoRecord>(value.clone()) {
            Ok(record) => Some(TodoItem {
                id: id.clone(),
                text: record.text,
                completed: record.completed,
            }),
            Err(err) => {
                warn!(id = %id, "skipping malformed to-do: {err}");
                None
            }
        })
        .collect();
    items.sort_by(|a, b| a.id.cmp(&b.id));
    items
}

pub struct TodoList {
    store: Arc<dyn KeyValueStore>,
    path: String,
    subscription: Option<KvSubscription>,
}

impl TodoList {
    #[must_use]
    pub fn open(store: Arc<dyn KeyValueStore>, uid: &str) -> Self {
        let path = format!("todos/{uid}");
        let subscription = store.subscribe(&path);
        Self {
            store,
            path,
            subscription: Some(subscription),
        }
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.path)
    }

    #[must_use]
    pub fn items(&self) -> Vec<TodoItem> {
        let snapshot = self.subscription.as_ref().and_then(KvSubscription::current);
        items_from(snapshot.as_ref())
    }

    /// Waits for the next delivery. Returns `false` once the list is closed.
    pub async fn changed(&mut self) -> bool {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.changed().await,
            None => false,
        }
    }

    /// Adds a new open task. Blank input is ignored.
    ///
    /// # Errors
    /// Returns the store error when the write is rejected.
    pub async fn add(&self, text: &str) -> Result<Option<String>, QueryError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let record = TodoRecord {
            text: text.to_string(),
            completed: false,
        };
        let id = self.store.push(&self.path, serde_json::to_value(&record)?).await?;
        debug!(id = %id, "task added");
        Ok(Some(id))
    }

    /// Flips the completion flag of `id`.
    ///
    /// # Errors
    /// `QueryError::NotFound` when the task is not in the current list.
    pub async fn toggle(&self, id: &str) -> Result<(), QueryError> {
        let item = self
            .items()
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| QueryError::NotFound(id.to_string()))?;
        let mut patch = Map::new();
        patch.insert("completed".to_string(), Value::Bool(!item.completed));
        self.store.update(&self.item_path(id), patch).await
    }

    /// # Errors
    /// Returns the store error when the delete is rejected.
    pub async fn delete(&self, id: &str) -> Result<(), QueryError> {
        self.store.remove(&self.item_path(id)).await
    }

    pub fn close(&mut self) {
        self.subscription = None;
    }
}

//! In-process document and key-value backends.
//!
//! They reproduce the delivery model the views rely on: server-assigned ids and
//! timestamps, full result sets on every change, and per-collection access
//! denial to exercise the permission-error path.

use super::{
    document::{Document, DocumentStore, LiveQuery, Query, QueryState, SortOrder},
    kv::{KeyValueStore, KvSubscription},
};
use crate::{error::QueryError, BoxFuture};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;
use ulid::Ulid;

/// Push keys are time-ordered and strictly increasing within a store.
fn next_id(last: &mut Option<Ulid>) -> String {
    let mut id = Ulid::new();
    if let Some(previous) = *last {
        if id <= previous {
            id = previous.increment().unwrap_or(id);
        }
    }
    *last = Some(id);
    id.to_string()
}

#[derive(Debug, Default)]
struct Collections {
    documents: HashMap<String, Vec<Document>>,
    denied: HashSet<String>,
    watchers: Vec<(Query, watch::Sender<QueryState>)>,
    last_id: Option<Ulid>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Collections {
    fn evaluate(&self, query: &Query) -> QueryState {
        if self.denied.contains(&query.collection) {
            return QueryState::Failed(QueryError::PermissionDenied);
        }
        let mut matching: Vec<Document> = self
            .documents
            .get(&query.collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| query.matches(&document.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        if query.order == SortOrder::Descending {
            matching.reverse();
        }
        QueryState::Ready(matching)
    }

    fn notify(&mut self, collection: &str) {
        self.watchers.retain(|(_, tx)| !tx.is_closed());
        let updates: Vec<(usize, QueryState)> = self
            .watchers
            .iter()
            .enumerate()
            .filter(|(_, (query, _))| query.collection == collection)
            .map(|(index, (query, _))| (index, self.evaluate(query)))
            .collect();
        for (index, state) in updates {
            self.watchers[index].1.send_replace(state);
        }
    }

    /// Server timestamps are strictly increasing so creation order is total.
    fn server_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created_at {
            if now <= last {
                now = last + TimeDelta::microseconds(1);
            }
        }
        self.last_created_at = Some(now);
        now
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocuments {
    inner: Mutex<Collections>,
}

impl MemoryDocuments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Denies all access to `collection`, as a security rule would.
    pub fn deny(&self, collection: &str) {
        let mut inner = self.inner();
        inner.denied.insert(collection.to_string());
        inner.notify(collection);
    }

    /// Number of documents currently stored in `collection`.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.inner().documents.get(collection).map_or(0, Vec::len)
    }

    /// Number of live queries still held by a view.
    #[must_use]
    pub fn live_queries(&self) -> usize {
        let mut inner = self.inner();
        inner.watchers.retain(|(_, tx)| !tx.is_closed());
        inner.watchers.len()
    }

    fn insert(&self, collection: &str, record: Value) -> Result<String, QueryError> {
        let mut inner = self.inner();
        if inner.denied.contains(collection) {
            return Err(QueryError::PermissionDenied);
        }
        let id = next_id(&mut inner.last_id);
        let created_at = inner.server_timestamp();
        inner
            .documents
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                created_at,
                data: record,
            });
        debug!(collection, id = %id, "document added");
        inner.notify(collection);
        Ok(id)
    }

    fn erase(&self, collection: &str, id: &str) -> Result<(), QueryError> {
        let mut inner = self.inner();
        if inner.denied.contains(collection) {
            return Err(QueryError::PermissionDenied);
        }
        let documents = inner
            .documents
            .get_mut(collection)
            .ok_or_else(|| QueryError::NotFound(id.to_string()))?;
        let position = documents
            .iter()
            .position(|document| document.id == id)
            .ok_or_else(|| QueryError::NotFound(id.to_string()))?;
        documents.remove(position);
        inner.notify(collection);
        Ok(())
    }
}

impl DocumentStore for MemoryDocuments {
    fn add<'a>(&'a self, collection: &'a str, record: Value) -> BoxFuture<'a, Result<String, QueryError>> {
        Box::pin(async move { self.insert(collection, record) })
    }

    fn query(&self, query: Query) -> LiveQuery {
        let mut inner = self.inner();
        let (tx, rx) = watch::channel(inner.evaluate(&query));
        inner.watchers.push((query, tx));
        LiveQuery::new(rx)
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<(), QueryError>> {
        Box::pin(async move { self.erase(collection, id) })
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn lookup<'v>(root: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(root, |node, segment| node.get(*segment))
}

/// Walks to `path`, turning missing or scalar nodes into objects on the way.
/// A freshly created leaf is `Null`.
fn lookup_or_create<'v>(root: &'v mut Value, path: &[&str]) -> &'v mut Value {
    let mut node = root;
    for segment in path {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = &mut node[*segment];
    }
    node
}

/// Removes the value at `path` and any parents left empty by the removal.
fn remove_at(node: &mut Value, path: &[&str]) -> bool {
    let Some((first, rest)) = path.split_first() else {
        return false;
    };
    let Value::Object(map) = node else {
        return false;
    };
    if rest.is_empty() {
        return map.remove(*first).is_some();
    }
    let removed = map.get_mut(*first).is_some_and(|child| remove_at(child, rest));
    if map.get(*first).is_some_and(|child| child.as_object().is_some_and(Map::is_empty)) {
        map.remove(*first);
    }
    removed
}

/// Empty objects read as "nothing stored", matching the hosted store.
fn visible(value: Option<&Value>) -> Option<Value> {
    value
        .filter(|value| !value.is_null())
        .filter(|value| value.as_object().map_or(true, |map| !map.is_empty()))
        .cloned()
}

#[derive(Debug)]
struct Tree {
    root: Value,
    watchers: Vec<(String, watch::Sender<Option<Value>>)>,
    last_id: Option<Ulid>,
}

impl Default for Tree {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
            watchers: Vec::new(),
            last_id: None,
        }
    }
}

impl Tree {
    fn snapshot(&self, path: &str) -> Option<Value> {
        visible(lookup(&self.root, &segments(path)))
    }

    fn notify(&mut self) {
        self.watchers.retain(|(_, tx)| !tx.is_closed());
        for (path, tx) in &self.watchers {
            let next = visible(lookup(&self.root, &segments(path)));
            tx.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            });
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    tree: Mutex<Tree>,
}

impl MemoryKeyValue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the value stored at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        self.tree().snapshot(path)
    }

    fn append(&self, path: &str, value: Value) -> String {
        let mut tree = self.tree();
        let id = next_id(&mut tree.last_id);
        let mut target = segments(path);
        target.push(id.as_str());
        *lookup_or_create(&mut tree.root, &target) = value;
        tree.notify();
        id
    }

    fn merge(&self, path: &str, patch: Map<String, Value>) {
        let mut tree = self.tree();
        let node = lookup_or_create(&mut tree.root, &segments(path));
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            for (key, value) in patch {
                map.insert(key, value);
            }
        }
        tree.notify();
    }

    fn delete_at(&self, path: &str) {
        let mut tree = self.tree();
        if remove_at(&mut tree.root, &segments(path)) {
            tree.notify();
        }
    }
}

impl KeyValueStore for MemoryKeyValue {
    fn push<'a>(&'a self, path: &'a str, value: Value) -> BoxFuture<'a, Result<String, QueryError>> {
        Box::pin(async move { Ok(self.append(path, value)) })
    }

    fn subscribe(&self, path: &str) -> KvSubscription {
        let mut tree = self.tree();
        let (tx, rx) = watch::channel(tree.snapshot(path));
        tree.watchers.push((path.to_string(), tx));
        KvSubscription::new(rx)
    }

    fn update<'a>(
        &'a self,
        path: &'a str,
        patch: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), QueryError>> {
        Box::pin(async move {
            self.merge(path, patch);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), QueryError>> {
        Box::pin(async move {
            self.delete_at(path);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn live_query_redelivers_filtered_ordered_results() {
        let store = MemoryDocuments::new();
        let mut live = store.query(
            Query::collection("files")
                .where_eq("owner", "u1")
                .order_by_created(SortOrder::Descending),
        );
        assert_eq!(live.current(), QueryState::Ready(Vec::new()));

        store.add("files", json!({"owner": "u1", "fileName": "a"})).await.expect("add");
        store.add("files", json!({"owner": "u2", "fileName": "b"})).await.expect("add");
        store.add("files", json!({"owner": "u1", "fileName": "c"})).await.expect("add");

        let state = live
            .wait_for(|state| matches!(state, QueryState::Ready(docs) if docs.len() == 2))
            .await
            .expect("delivery");
        let QueryState::Ready(docs) = state else {
            panic!("expected ready state");
        };
        let names: Vec<&str> = docs.iter().filter_map(|d| d.data["fileName"].as_str()).collect();
        assert_eq!(names, vec!["c", "a"]);
        assert!(docs[0].created_at > docs[1].created_at);
    }

    #[tokio::test]
    async fn denied_collection_fails_queries_and_writes() {
        let store = MemoryDocuments::new();
        store.deny("files");
        let live = store.query(Query::collection("files"));
        assert_eq!(live.current(), QueryState::Failed(QueryError::PermissionDenied));
        assert_eq!(
            store.add("files", json!({})).await,
            Err(QueryError::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn dropped_live_queries_are_released() {
        let store = MemoryDocuments::new();
        let live = store.query(Query::collection("messages"));
        assert_eq!(store.live_queries(), 1);
        drop(live);
        assert_eq!(store.live_queries(), 0);
    }

    #[tokio::test]
    async fn delete_unknown_document_is_not_found() {
        let store = MemoryDocuments::new();
        assert!(matches!(
            store.delete("files", "missing").await,
            Err(QueryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn push_keys_sort_in_creation_order() {
        let store = MemoryKeyValue::new();
        let first = store.push("todos/u1", json!({"n": 1})).await.expect("push");
        let second = store.push("todos/u1", json!({"n": 2})).await.expect("push");
        assert!(first < second);

        let subtree = store.get("todos/u1").expect("subtree");
        let keys: Vec<&String> = subtree.as_object().expect("object").keys().collect();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_remove_prunes_empty_parents() {
        let store = MemoryKeyValue::new();
        let id = store
            .push("todos/u1", json!({"text": "a", "completed": false}))
            .await
            .expect("push");
        let path = format!("todos/u1/{id}");

        let mut patch = Map::new();
        patch.insert("completed".to_string(), json!(true));
        store.update(&path, patch).await.expect("update");
        assert_eq!(store.get(&path), Some(json!({"text": "a", "completed": true})));

        store.remove(&path).await.expect("remove");
        assert_eq!(store.get("todos/u1"), None);
        assert_eq!(store.get("todos"), None);
    }

    #[test]
    fn path_walk_replaces_scalars_and_prunes_upwards() {
        let mut root = json!({"todos": "stale"});
        *lookup_or_create(&mut root, &["todos", "u1", "t1"]) = json!({"text": "a"});
        assert_eq!(root, json!({"todos": {"u1": {"t1": {"text": "a"}}}}));

        assert!(lookup_or_create(&mut root, &["todos", "u2"]).is_null());

        assert!(!remove_at(&mut root, &["todos", "u3", "t1"]));
        assert!(remove_at(&mut root, &["todos", "u1", "t1"]));
        assert_eq!(root, json!({"todos": {"u2": null}}));
    }

    #[tokio::test]
    async fn subscription_sees_only_its_subtree() {
        let store = MemoryKeyValue::new();
        let mut mine = store.subscribe("todos/u1");
        assert_eq!(mine.current(), None);

        store.push("todos/u2", json!({"text": "theirs"})).await.expect("push");
        assert_eq!(mine.current(), None);

        store.push("todos/u1", json!({"text": "mine"})).await.expect("push");
        assert!(mine.changed().await);
        let snapshot = mine.current().expect("snapshot");
        assert_eq!(snapshot.as_object().map(Map::len), Some(1));
    }
}

use crate::{error::QueryError, BoxFuture};
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Handle on a key-value subtree. Each delivery is the whole subtree, or
/// `None` when nothing is stored at the path. Dropping it unsubscribes.
#[derive(Debug)]
pub struct KvSubscription {
    rx: watch::Receiver<Option<Value>>,
}

impl KvSubscription {
    #[must_use]
    pub fn new(rx: watch::Receiver<Option<Value>>) -> Self {
        Self { rx }
    }

    #[must_use]
    pub fn current(&self) -> Option<Value> {
        self.rx.borrow().clone()
    }

    /// Waits for the next delivery. Returns `false` once the store went away.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&Option<Value>) -> bool,
    ) -> Option<Option<Value>> {
        self.rx.wait_for(predicate).await.ok().map(|value| value.clone())
    }
}

pub trait KeyValueStore: Send + Sync {
    /// Appends `value` under a new time-ordered key below `path` and returns the key.
    fn push<'a>(&'a self, path: &'a str, value: Value) -> BoxFuture<'a, Result<String, QueryError>>;

    fn subscribe(&self, path: &str) -> KvSubscription;

    /// Merges `patch` into the object at `path`.
    fn update<'a>(
        &'a self,
        path: &'a str,
        patch: Map<String, Value>,
    ) -> BoxFuture<'a, Result<(), QueryError>>;

    fn remove<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), QueryError>>;
}

use crate::{error::QueryError, BoxFuture};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

/// A stored record with its server-assigned id and creation timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub data: Value,
}

impl Document {
    /// Decodes the record body into a typed view.
    ///
    /// # Errors
    /// Returns `QueryError::Decode` when the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        Ok(T::deserialize(&self.data)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Value,
}

/// Collection query, always ordered by creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filter: Option<FieldFilter>,
    pub order: SortOrder,
}

impl Query {
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filter: None,
            order: SortOrder::Ascending,
        }
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, equals: impl Into<Value>) -> Self {
        self.filter = Some(FieldFilter {
            field: field.into(),
            equals: equals.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by_created(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| data.get(&filter.field) == Some(&filter.equals))
    }
}

/// Latest delivery of a live query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    Pending,
    Ready(Vec<Document>),
    Failed(QueryError),
}

/// Handle on a live query. Dropping it ends the subscription.
#[derive(Debug)]
pub struct LiveQuery {
    rx: watch::Receiver<QueryState>,
}

impl LiveQuery {
    #[must_use]
    pub fn new(rx: watch::Receiver<QueryState>) -> Self {
        Self { rx }
    }

    #[must_use]
    pub fn current(&self) -> QueryState {
        self.rx.borrow().clone()
    }

    /// Waits for the next delivery. Returns `false` once the store went away.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Waits until a delivery satisfies `predicate` and returns it.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&QueryState) -> bool) -> Option<QueryState> {
        self.rx.wait_for(predicate).await.ok().map(|state| state.clone())
    }
}

pub trait DocumentStore: Send + Sync {
    /// Adds a record; the store assigns the id and creation timestamp.
    fn add<'a>(&'a self, collection: &'a str, record: Value) -> BoxFuture<'a, Result<String, QueryError>>;

    /// Opens a live query that re-delivers the full ordered result set on every change.
    fn query(&self, query: Query) -> LiveQuery;

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<(), QueryError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn filter_matches_on_equality() {
        let query = Query::collection("files").where_eq("owner", "u1");
        assert!(query.matches(&json!({"owner": "u1", "fileName": "a.png"})));
        assert!(!query.matches(&json!({"owner": "u2"})));
        assert!(!query.matches(&json!({"fileName": "a.png"})));
        assert!(Query::collection("messages").matches(&json!({})));
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        #[derive(Debug, Deserialize)]
        struct Named {
            #[allow(dead_code)]
            name: String,
        }

        let document = Document {
            id: "d1".to_string(),
            created_at: Utc::now(),
            data: json!({"name": 42}),
        };
        assert!(matches!(document.decode::<Named>(), Err(QueryError::Decode(_))));
    }
}

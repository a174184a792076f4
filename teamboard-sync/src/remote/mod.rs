//! Remote document store seam
//!
//! The store is schema-less: documents are JSON objects addressed by hierarchical
//! paths. It supports one-shot queries, push subscriptions and document CRUD. The
//! engine only ever talks to it through [`RemoteStore`].

mod memory;

pub use memory::{MemoryStore, WriteKind, WriteRecord};

use crate::error::{Result, SyncError};
use crate::types::{CollectionPath, DocPath, Record};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use tokio::sync::mpsc;

/// Document body
pub type Fields = Map<String, Value>;

/// One full query result delivered by a push subscription
pub type Snapshot = Result<Vec<Document>>;

/// Receiving end of a push subscription. Dropping it unsubscribes.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Snapshot>;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decode into a record, restoring the id from the document
    pub fn decode<T: Record>(&self) -> Result<T> {
        let mut record: T =
            serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
                SyncError::Decode {
                    path: self.id.clone(),
                    message: e.to_string(),
                }
            })?;
        record.set_id(&self.id);
        Ok(record)
    }

    /// Encode a record body (without its id)
    pub fn encode<T: Record>(record: &T) -> Result<Fields> {
        match serde_json::to_value(record)? {
            Value::Object(mut fields) => {
                fields.remove("id");
                Ok(fields)
            }
            other => Err(SyncError::Decode {
                path: record.id().to_string(),
                message: format!("record encodes to {other}, expected an object"),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Decode a snapshot, skipping documents that do not fit the record type
pub fn decode_all<T: Record>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("skipping undecodable document: {}", e);
                None
            }
        })
        .collect()
}

/// Query filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field == value`
    Eq { field: String, value: Value },
    /// `field` is an array containing `value`
    ArrayContains { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::Eq {
            field: field.into(),
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        }
    }

    pub fn matches(&self, data: &Fields) -> bool {
        match self {
            Self::Eq { field, value } => data.get(field) == Some(value),
            Self::ArrayContains { field, value } => data
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// A collection query: filters are AND-ed, results sorted ascending by `order_by`
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
    pub order_by: Option<String>,
}

impl Query {
    pub fn collection(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Sorted by `position`, the query every positioned container uses
    pub fn by_position(collection: CollectionPath) -> Self {
        Self::collection(collection).order_by("position")
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| filter.matches(&doc.data))
    }

    /// Filter and sort documents of this query's collection
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut selected: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if let Some(field) = &self.order_by {
            selected.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
        }
        selected
    }
}

/// Ordering used for `order_by`: missing < null < bool < number < string.
/// Other values compare equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Capability set of the hosted document database
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// One-shot query
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Read one document; `None` if it does not exist
    async fn get(&self, path: &DocPath) -> Result<Option<Document>>;

    /// Create a document with a store-generated id
    async fn create(&self, collection: &CollectionPath, data: Fields) -> Result<String>;

    /// Merge `data` into an existing document
    async fn update(&self, path: &DocPath, data: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &DocPath) -> Result<()>;

    /// Push subscription: a snapshot now and after every matching change
    async fn listen(&self, query: Query) -> Result<SnapshotReceiver>;
}

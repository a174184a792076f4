//! In-process document store
//!
//! Behaves like the hosted database as far as the engine can observe: generated ids,
//! ordered queries, push delivery after every write. Adds fault injection, optional
//! latency and a write journal so tests can assert exactly what reached the store.

use super::{Document, Fields, Query, RemoteStore, Snapshot, SnapshotReceiver};
use crate::error::{Result, SyncError};
use crate::types::{CollectionPath, DocPath, Record};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Kind of a journaled write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
    Delete,
}

/// A write that reached the store
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub kind: WriteKind,
    pub path: String,
    pub data: Option<Fields>,
}

struct Listener {
    query: Query,
    sender: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Faults {
    failing_prefixes: Vec<String>,
    fail_next: usize,
    fail_reads: bool,
}

#[derive(Default)]
struct State {
    collections: HashMap<CollectionPath, BTreeMap<String, Fields>>,
    listeners: Vec<Listener>,
    faults: Faults,
    journal: Vec<WriteRecord>,
}

impl State {
    fn documents(&self, collection: &CollectionPath) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&mut self, collection: &CollectionPath) {
        let docs = self.documents(collection);
        self.listeners.retain(|listener| {
            if listener.sender.is_closed() {
                return false;
            }
            if &listener.query.collection != collection {
                return true;
            }
            listener
                .sender
                .send(Ok(listener.query.apply(docs.clone())))
                .is_ok()
        });
    }

    fn check_write(&mut self, op: &str, path: &str) -> Result<()> {
        if self.faults.fail_next > 0 {
            self.faults.fail_next -= 1;
            return Err(SyncError::remote(op, path, "injected failure"));
        }
        if self
            .faults
            .failing_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Err(SyncError::remote(op, path, "permission denied"));
        }
        Ok(())
    }

    fn check_read(&self, op: &str, path: &str) -> Result<()> {
        if self.faults.fail_reads {
            return Err(SyncError::remote(op, path, "unavailable"));
        }
        Ok(())
    }
}

/// In-memory [`RemoteStore`]
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits `latency` before touching the data
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Insert a record under its own id without journaling the write
    pub fn seed<T: Record>(&self, collection: &CollectionPath, record: &T) -> Result<()> {
        let fields = Document::encode(record)?;
        self.seed_fields(collection, record.id(), fields);
        Ok(())
    }

    /// Insert raw fields under `id` without journaling the write
    pub fn seed_fields(&self, collection: &CollectionPath, id: &str, fields: Fields) {
        let mut state = self.lock();
        state
            .collections
            .entry(collection.clone())
            .or_default()
            .insert(id.to_string(), fields);
        state.notify(collection);
    }

    /// All documents of a collection, ordered by id
    pub fn documents(&self, collection: &CollectionPath) -> Vec<Document> {
        self.lock().documents(collection)
    }

    pub fn document(&self, path: &DocPath) -> Option<Document> {
        self.lock()
            .collections
            .get(path.collection())
            .and_then(|docs| docs.get(path.id()))
            .map(|data| Document::new(path.id(), data.clone()))
    }

    pub fn journal(&self) -> Vec<WriteRecord> {
        self.lock().journal.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().journal.len()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Reject writes to every path starting with `prefix`
    pub fn fail_writes_under(&self, prefix: impl Into<String>) {
        self.lock().faults.failing_prefixes.push(prefix.into());
    }

    /// Reject the next `count` writes, whatever their path
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().faults.fail_next = count;
    }

    /// Make queries, reads and subscriptions fail
    pub fn fail_reads(&self, fail: bool) {
        self.lock().faults.fail_reads = fail;
    }

    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }

    /// Open push subscriptions
    pub fn listener_count(&self) -> usize {
        let mut state = self.lock();
        state.listeners.retain(|l| !l.sender.is_closed());
        state.listeners.len()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.delay().await;
        let state = self.lock();
        state.check_read("query", query.collection.as_str())?;
        Ok(query.apply(state.documents(&query.collection)))
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        self.delay().await;
        {
            let state = self.lock();
            state.check_read("get", &path.to_string())?;
        }
        Ok(self.document(path))
    }

    async fn create(&self, collection: &CollectionPath, data: Fields) -> Result<String> {
        self.delay().await;
        let id = ulid::Ulid::new().to_string();
        let path = collection.doc(id.clone()).to_string();
        let mut state = self.lock();
        state.check_write("create", &path)?;
        state
            .collections
            .entry(collection.clone())
            .or_default()
            .insert(id.clone(), data.clone());
        state.journal.push(WriteRecord {
            kind: WriteKind::Create,
            path,
            data: Some(data),
        });
        state.notify(collection);
        Ok(id)
    }

    async fn update(&self, path: &DocPath, data: Fields) -> Result<()> {
        self.delay().await;
        let display = path.to_string();
        let mut state = self.lock();
        state.check_write("update", &display)?;
        let existing = state
            .collections
            .get_mut(path.collection())
            .and_then(|docs| docs.get_mut(path.id()))
            .ok_or_else(|| SyncError::DocumentNotFound {
                path: display.clone(),
            })?;
        for (field, value) in &data {
            existing.insert(field.clone(), value.clone());
        }
        state.journal.push(WriteRecord {
            kind: WriteKind::Update,
            path: display,
            data: Some(data),
        });
        state.notify(path.collection());
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<()> {
        self.delay().await;
        let display = path.to_string();
        let mut state = self.lock();
        state.check_write("delete", &display)?;
        let removed = state
            .collections
            .get_mut(path.collection())
            .and_then(|docs| docs.remove(path.id()))
            .is_some();
        state.journal.push(WriteRecord {
            kind: WriteKind::Delete,
            path: display,
            data: None,
        });
        if removed {
            state.notify(path.collection());
        }
        Ok(())
    }

    async fn listen(&self, query: Query) -> Result<SnapshotReceiver> {
        self.delay().await;
        let mut state = self.lock();
        state.check_read("listen", query.collection.as_str())?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let initial = query.apply(state.documents(&query.collection));
        // The receiver is still held here, so this cannot fail.
        let _ = sender.send(Ok(initial));
        state.listeners.push(Listener { query, sender });
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Filter;
    use crate::types::{COLUMNS, TEAMS};
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    fn columns() -> CollectionPath {
        CollectionPath::root(TEAMS).child("t1", COLUMNS)
    }

    #[tokio::test]
    async fn test_create_query_update_delete() {
        let store = MemoryStore::new();
        let a = store
            .create(&columns(), fields(json!({"name": "A", "position": 1})))
            .await
            .unwrap();
        let b = store
            .create(&columns(), fields(json!({"name": "B", "position": 0})))
            .await
            .unwrap();

        let docs = store.query(&Query::by_position(columns())).await.unwrap();
        assert_eq!(docs.iter().map(|d| d.id.clone()).collect::<Vec<_>>(), vec![b.clone(), a.clone()]);

        store
            .update(&columns().doc(a.clone()), fields(json!({"position": -1})))
            .await
            .unwrap();
        let first = store.query(&Query::by_position(columns())).await.unwrap();
        assert_eq!(first[0].id, a);
        assert_eq!(first[0].get("name"), Some(&json!("A")));

        store.delete(&columns().doc(a.clone())).await.unwrap();
        store.delete(&columns().doc(a)).await.unwrap();
        assert_eq!(store.documents(&columns()).len(), 1);
        assert_eq!(store.write_count(), 5);
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update(&columns().doc("ghost"), fields(json!({"position": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DocumentNotFound { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_listen_gets_initial_and_pushes() {
        let store = MemoryStore::new();
        store.seed_fields(&columns(), "c1", fields(json!({"name": "Todo", "position": 0})));

        let mut rx = store
            .listen(Query::by_position(columns()).filter(Filter::eq("name", "Todo")))
            .await
            .unwrap();
        let initial = rx.recv().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        store
            .create(&columns(), fields(json!({"name": "Done", "position": 1})))
            .await
            .unwrap();
        let pushed = rx.recv().await.unwrap().unwrap();
        assert_eq!(pushed.len(), 1, "filter still applies to pushes");

        drop(rx);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryStore::new();
        store.seed_fields(&columns(), "c1", fields(json!({"position": 0})));

        store.fail_next_writes(1);
        assert!(store
            .update(&columns().doc("c1"), fields(json!({"position": 1})))
            .await
            .is_err());
        assert!(store
            .update(&columns().doc("c1"), fields(json!({"position": 1})))
            .await
            .is_ok());

        store.fail_writes_under("teams/t1");
        let err = store.delete(&columns().doc("c1")).await.unwrap_err();
        assert!(err.is_remote());

        store.clear_faults();
        store.fail_reads(true);
        assert!(store.query(&Query::collection(columns())).await.is_err());
    }
}

//! Remote sync adapter
//!
//! Bridges one entity kind between the remote store and its local cache. Column, Task
//! and ChecklistItem adapters are the same code parameterized by [`Positioned`].

use crate::cache::LocalCache;
use crate::config::CompactionPolicy;
use crate::error::{Result, SyncError};
use crate::position::{changed_positions, next_append_position, renumber};
use crate::remote::{decode_all, Document, Query, RemoteStore};
use crate::types::{
    CollectionPath, ContainerKey, ContainerScope, DocPath, Patch, Positioned, Record,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A live push subscription. Dropping it (or calling [`Subscription::unsubscribe`])
/// stops cache updates and releases the remote listeners.
#[derive(Debug, Default)]
pub struct Subscription {
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    fn new(tasks: Vec<JoinHandle<()>>) -> Self {
        Self { tasks }
    }

    /// A subscription that never delivers anything (unresolvable scope)
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Sync adapter for one positioned entity kind
pub struct SyncAdapter<T: Positioned> {
    store: Arc<dyn RemoteStore>,
    cache: Arc<LocalCache<T>>,
    compaction: CompactionPolicy,
}

impl<T: Positioned> Clone for SyncAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            compaction: self.compaction,
        }
    }
}

impl<T: Positioned> SyncAdapter<T> {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        cache: Arc<LocalCache<T>>,
        compaction: CompactionPolicy,
    ) -> Self {
        Self {
            store,
            cache,
            compaction,
        }
    }

    pub fn cache(&self) -> &Arc<LocalCache<T>> {
        &self.cache
    }

    fn require(scope: &T::Scope) -> Result<CollectionPath> {
        scope
            .collection()
            .ok_or_else(|| SyncError::missing_parent(scope.describe()))
    }

    fn require_id(id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(SyncError::missing_parent(format!("{} id", T::NOUN)));
        }
        Ok(())
    }

    /// Read all items of a collection sorted by position
    pub async fn read_sorted(&self, collection: &CollectionPath) -> Result<Vec<T>> {
        let docs = self
            .store
            .query(&Query::by_position(collection.clone()))
            .await?;
        Ok(decode_all(&docs))
    }

    /// One-shot read of the container, written to the cache.
    ///
    /// An unresolvable scope yields an empty list and an empty cache entry.
    pub async fn fetch_all(&self, scope: &T::Scope) -> Result<Vec<T>> {
        let key = scope.cache_key();
        let Some(collection) = scope.collection() else {
            tracing::debug!("fetch {} skipped, unresolved scope {}", T::NOUN, scope.describe());
            self.cache.set_all(&key, Vec::new());
            return Ok(Vec::new());
        };

        let items = self.read_sorted(&collection).await?;
        tracing::debug!("fetched {} {} items from {}", items.len(), T::NOUN, collection);
        self.cache.set_all(&key, items.clone());
        Ok(items)
    }

    /// Keep the cache entry for `scope` in sync with every remote change
    pub async fn subscribe(&self, scope: &T::Scope) -> Result<Subscription> {
        self.subscribe_with(scope, |_| {}).await
    }

    /// Like [`SyncAdapter::subscribe`], also calling `on_change` with each pushed list
    pub async fn subscribe_with<F>(&self, scope: &T::Scope, on_change: F) -> Result<Subscription>
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        let key = scope.cache_key();
        let Some(collection) = scope.collection() else {
            tracing::debug!("subscribe {} skipped, unresolved scope {}", T::NOUN, scope.describe());
            self.cache.set_all(&key, Vec::new());
            on_change(&[]);
            return Ok(Subscription::noop());
        };

        let mut receiver = self.store.listen(Query::by_position(collection.clone())).await?;
        let cache = Arc::clone(&self.cache);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = receiver.recv().await {
                match snapshot {
                    Ok(docs) => {
                        let items: Vec<T> = decode_all(&docs);
                        tracing::trace!("push for {}: {} items", collection, items.len());
                        cache.set_all(&key, items.clone());
                        on_change(&items);
                    }
                    Err(e) => tracing::warn!("subscription to {} errored: {}", collection, e),
                }
            }
        });
        Ok(Subscription::new(vec![task]))
    }

    /// Append an item at `max + 1`, computed from a fresh remote read
    pub async fn add(&self, scope: &T::Scope, mut item: T) -> Result<T> {
        let collection = Self::require(scope)?;
        let siblings = self.read_sorted(&collection).await?;
        item.set_position(next_append_position(
            siblings.iter().map(Positioned::position),
        ));

        let id = self
            .store
            .create(&collection, Document::encode(&item)?)
            .await?;
        item.set_id(&id);
        tracing::info!("added {} {} at position {}", T::NOUN, id, item.position());

        // The subscription echo may already have delivered it.
        let key = scope.cache_key();
        if self.cache.find(&key, &id).is_none() {
            self.cache.insert(&key, item.clone());
        }
        Ok(item)
    }

    /// Write a partial update remotely, then mirror it into the cache
    pub async fn update(&self, scope: &T::Scope, id: &str, patch: &Patch) -> Result<()> {
        let collection = Self::require(scope)?;
        Self::require_id(id)?;
        self.store
            .update(&collection.doc(id), patch.fields().clone())
            .await?;
        tracing::debug!("updated {} {}", T::NOUN, id);
        self.cache.patch(&scope.cache_key(), id, patch);
        Ok(())
    }

    /// Delete remotely, then from the cache. Siblings are renumbered only under
    /// [`CompactionPolicy::AfterDelete`].
    pub async fn delete(&self, scope: &T::Scope, id: &str) -> Result<()> {
        let collection = Self::require(scope)?;
        Self::require_id(id)?;
        self.store.delete(&collection.doc(id)).await?;
        tracing::info!("deleted {} {}", T::NOUN, id);
        self.cache.remove(&scope.cache_key(), id);

        if self.compaction == CompactionPolicy::AfterDelete {
            self.compact(scope).await?;
        }
        Ok(())
    }

    /// Renumber a container densely, remotely and locally. Returns the write count.
    pub async fn compact(&self, scope: &T::Scope) -> Result<usize> {
        let collection = Self::require(scope)?;
        let current = self.read_sorted(&collection).await?;
        let compacted = renumber(current.clone());
        let writes = changed_positions(&current, &compacted);
        let written = write_positions(self.store.as_ref(), &collection, &writes).await?;
        self.cache.set_all(&scope.cache_key(), compacted);
        if written > 0 {
            tracing::info!("compacted {}: {} positions rewritten", collection, written);
        }
        Ok(written)
    }
}

/// Issue all position writes concurrently and wait for every one of them.
///
/// Fails with [`SyncError::PartialWrite`] if any write failed; the others still land.
pub async fn write_positions(
    store: &dyn RemoteStore,
    collection: &CollectionPath,
    writes: &[(String, usize)],
) -> Result<usize> {
    if writes.is_empty() {
        return Ok(0);
    }

    let paths: Vec<DocPath> = writes
        .iter()
        .map(|(id, _)| collection.doc(id.as_str()))
        .collect();
    let results = join_all(
        paths
            .iter()
            .zip(writes)
            .map(|(path, (_, position))| store.update(path, Patch::position(*position).into_fields())),
    )
    .await;

    let mut failed = 0;
    for ((id, _), result) in writes.iter().zip(&results) {
        if let Err(e) = result {
            tracing::warn!("position write for {}/{} failed: {}", collection, id, e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(SyncError::PartialWrite {
            failed,
            total: writes.len(),
        });
    }
    Ok(writes.len())
}

/// Merge lists by id: first-seen order is kept, a later copy of an id replaces the
/// earlier value.
pub fn merge_unique<T: Record>(lists: impl IntoIterator<Item = Vec<T>>) -> Vec<T> {
    let mut merged: Vec<T> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in lists.into_iter().flatten() {
        match index.get(item.id()) {
            Some(&slot) => merged[slot] = item,
            None => {
                index.insert(item.id().to_string(), merged.len());
                merged.push(item);
            }
        }
    }
    merged
}

/// Subscribe to several queries and write their deduplicated union to one cache key.
///
/// The cache is written once per push, after every query has delivered its first
/// snapshot.
pub async fn subscribe_union<T: Record>(
    store: &dyn RemoteStore,
    cache: Arc<LocalCache<T>>,
    key: ContainerKey,
    queries: Vec<Query>,
) -> Result<Subscription> {
    let mut receivers = Vec::with_capacity(queries.len());
    for query in queries {
        receivers.push(store.listen(query).await?);
    }

    let slots = receivers.len();
    let (combined_tx, mut combined_rx) = mpsc::unbounded_channel::<(usize, Vec<T>)>();
    let mut tasks = Vec::with_capacity(slots + 1);

    for (slot, mut receiver) in receivers.into_iter().enumerate() {
        let combined_tx = combined_tx.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(snapshot) = receiver.recv().await {
                match snapshot {
                    Ok(docs) => {
                        if combined_tx.send((slot, decode_all(&docs))).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("union subscription {} errored: {}", slot, e),
                }
            }
        }));
    }
    drop(combined_tx);

    tasks.push(tokio::spawn(async move {
        let mut latest: Vec<Option<Vec<T>>> = vec![None; slots];
        while let Some((slot, items)) = combined_rx.recv().await {
            latest[slot] = Some(items);
            if latest.iter().all(Option::is_some) {
                let merged = merge_unique(latest.iter().flatten().cloned());
                tracing::trace!("union for {}: {} items", key, merged.len());
                cache.set_all(&key, merged);
            }
        }
    }));

    Ok(Subscription::new(tasks))
}

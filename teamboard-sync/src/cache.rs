//! Local ordered-collection cache
//!
//! Holds the best-known ordered sequence of children per container. All operations
//! are synchronous and infallible: missing keys or ids are no-ops. Each mutation bumps
//! a revision number that readers can watch to re-render.

use crate::position::sort_by_position;
use crate::types::{ContainerKey, Patch, Positioned, Record};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// In-memory projection of remote containers, keyed by parent id
#[derive(Debug)]
pub struct LocalCache<T: Record> {
    containers: RwLock<HashMap<ContainerKey, Vec<T>>>,
    revision: watch::Sender<u64>,
}

impl<T: Record> Default for LocalCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> LocalCache<T> {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            containers: RwLock::new(HashMap::new()),
            revision,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ContainerKey, Vec<T>>> {
        self.containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ContainerKey, Vec<T>>> {
        self.containers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Replace the whole sequence for `key`. The caller supplies the order.
    pub fn set_all(&self, key: &ContainerKey, items: Vec<T>) {
        self.write().insert(key.clone(), items);
        self.bump();
    }

    /// Append one item, creating the container if needed. Ids are not deduplicated.
    pub fn insert(&self, key: &ContainerKey, item: T) {
        self.write().entry(key.clone()).or_default().push(item);
        self.bump();
    }

    /// Shallow-merge `patch` into the item with `id`
    pub fn patch(&self, key: &ContainerKey, id: &str, patch: &Patch) {
        let mut containers = self.write();
        let Some(item) = containers
            .get_mut(key)
            .and_then(|items| items.iter_mut().find(|item| item.id() == id))
        else {
            return;
        };

        match patch.apply(item) {
            Some(merged) => *item = merged,
            None => {
                tracing::warn!("patch for {} in {} does not fit the record, ignored", id, key);
                return;
            }
        }
        drop(containers);
        self.bump();
    }

    /// Remove the item with `id`
    pub fn remove(&self, key: &ContainerKey, id: &str) {
        let mut containers = self.write();
        let Some(items) = containers.get_mut(key) else {
            return;
        };
        let before = items.len();
        items.retain(|item| item.id() != id);
        let changed = items.len() != before;
        drop(containers);
        if changed {
            self.bump();
        }
    }

    /// Drop a whole container
    pub fn clear(&self, key: &ContainerKey) {
        if self.write().remove(key).is_some() {
            self.bump();
        }
    }

    /// Sequence for `key` in stored order (empty if unknown)
    pub fn get(&self, key: &ContainerKey) -> Vec<T> {
        self.read().get(key).cloned().unwrap_or_default()
    }

    pub fn find(&self, key: &ContainerKey, id: &str) -> Option<T> {
        self.read()
            .get(key)
            .and_then(|items| items.iter().find(|item| item.id() == id).cloned())
    }

    pub fn contains_key(&self, key: &ContainerKey) -> bool {
        self.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<ContainerKey> {
        let mut keys: Vec<_> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Current revision; increases on every mutation
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Reactive read hook: resolves whenever the cache changes
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl<T: Positioned> LocalCache<T> {
    /// Sequence for `key` in display order: stable-sorted by position.
    ///
    /// Stored order is only authoritative when it came from a renumbering step, so
    /// consumers that render should use this.
    pub fn ordered(&self, key: &ContainerKey) -> Vec<T> {
        let mut items = self.get(key);
        sort_by_position(&mut items);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChecklistItem, ChecklistItemId};

    fn item(id: &str, position: usize) -> ChecklistItem {
        let mut item = ChecklistItem::new(format!("item {id}"));
        item.id = ChecklistItemId::from(id);
        item.position = position;
        item
    }

    fn ids(items: &[ChecklistItem]) -> Vec<String> {
        items.iter().map(|i| i.id.to_string()).collect()
    }

    #[test]
    fn test_set_all_then_ordered_sorts_by_position() {
        let cache = LocalCache::new();
        let key = ContainerKey::from("t1");
        cache.set_all(&key, vec![item("X", 5), item("Y", 1), item("Z", 3)]);

        assert_eq!(ids(&cache.get(&key)), vec!["X", "Y", "Z"]);
        let ordered = cache.ordered(&key);
        assert_eq!(ids(&ordered), vec!["Y", "Z", "X"]);
        assert_eq!(
            ordered.iter().map(|i| i.position).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
    }

    #[test]
    fn test_insert_creates_key_and_does_not_dedupe() {
        let cache = LocalCache::new();
        let key = ContainerKey::from("t1");
        cache.insert(&key, item("A", 0));
        cache.insert(&key, item("A", 0));
        assert_eq!(cache.get(&key).len(), 2);
    }

    #[test]
    fn test_patch_and_missing_targets() {
        let cache = LocalCache::new();
        let key = ContainerKey::from("t1");
        cache.set_all(&key, vec![item("A", 0)]);

        cache.patch(&key, "A", &Patch::new().set("done", true));
        assert!(cache.find(&key, "A").unwrap().done);

        let revision = cache.revision();
        cache.patch(&key, "missing", &Patch::position(3));
        cache.patch(&ContainerKey::from("nope"), "A", &Patch::position(3));
        assert_eq!(cache.revision(), revision);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_ill_typed_patch_is_ignored() {
        let cache = LocalCache::new();
        let key = ContainerKey::from("t1");
        cache.set_all(&key, vec![item("A", 2)]);
        let revision = cache.revision();

        cache.patch(&key, "A", &Patch::new().set("position", "first"));
        assert_eq!(cache.find(&key, "A").unwrap().position, 2);
        assert_eq!(cache.revision(), revision);
        assert!(logs_contain("does not fit the record"));
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let cache = LocalCache::new();
        let key = ContainerKey::from("t1");
        cache.set_all(&key, vec![item("A", 0), item("B", 1)]);
        let revision = cache.revision();

        cache.remove(&key, "ghost");
        cache.remove(&ContainerKey::from("other"), "A");

        assert_eq!(ids(&cache.get(&key)), vec!["A", "B"]);
        assert_eq!(cache.revision(), revision);

        cache.remove(&key, "A");
        assert_eq!(ids(&cache.get(&key)), vec!["B"]);
    }

    #[test]
    fn test_unknown_key_reads_empty() {
        let cache: LocalCache<ChecklistItem> = LocalCache::new();
        assert!(cache.get(&ContainerKey::from("none")).is_empty());
        assert!(!cache.contains_key(&ContainerKey::from("none")));
    }

    #[tokio::test]
    async fn test_watch_fires_on_mutation() {
        let cache = LocalCache::new();
        let mut rx = cache.watch();
        cache.insert(&ContainerKey::from("t1"), item("A", 0));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }
}

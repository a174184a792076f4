//! Add, update and delete commands for positioned items
//!
//! One generic command per verb serves columns, tasks and checklist items alike. Each
//! goes through the entity's [`SyncAdapter`](crate::adapter::SyncAdapter), so the
//! remote write happens first and the cache mirrors it afterwards.

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::types::{ContainerScope, Patch, Positioned};
use serde_json::{json, Value};
use std::time::Instant;
use teamboard_operations::{async_trait, Execute, ExecutionResult, Operation};

/// Append a new item to a container
#[derive(Debug, Clone)]
pub struct AddItem<T: Positioned> {
    pub scope: T::Scope,
    pub item: T,
}

impl<T: Positioned> AddItem<T> {
    pub fn new(scope: T::Scope, item: T) -> Self {
        Self { scope, item }
    }
}

impl<T: Positioned> Operation for AddItem<T> {
    fn verb(&self) -> &'static str {
        "add"
    }

    fn noun(&self) -> &'static str {
        T::NOUN
    }

    fn description(&self) -> &'static str {
        "Append a new item at the end of its container"
    }
}

#[async_trait]
impl<T: Positioned> Execute<SyncContext, SyncError> for AddItem<T> {
    type Output = T;

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<T, SyncError> {
        let started = Instant::now();
        let input = json!({
            "container": self.scope.describe(),
            "item": serde_json::to_value(&self.item).unwrap_or(Value::Null),
        });
        let result = ctx.adapter::<T>().add(&self.scope, self.item.clone()).await;
        ExecutionResult::record(self, input, started, result, |item| {
            json!({ "id": item.id(), "position": item.position() })
        })
    }
}

/// Shallow-merge fields into an item
#[derive(Debug, Clone)]
pub struct UpdateItem<T: Positioned> {
    pub scope: T::Scope,
    pub id: String,
    pub patch: Patch,
    _kind: std::marker::PhantomData<fn() -> T>,
}

impl<T: Positioned> UpdateItem<T> {
    pub fn new(scope: T::Scope, id: impl Into<String>, patch: Patch) -> Self {
        Self {
            scope,
            id: id.into(),
            patch,
            _kind: std::marker::PhantomData,
        }
    }
}

impl<T: Positioned> Operation for UpdateItem<T> {
    fn verb(&self) -> &'static str {
        "update"
    }

    fn noun(&self) -> &'static str {
        T::NOUN
    }

    fn description(&self) -> &'static str {
        "Change fields of an item"
    }
}

#[async_trait]
impl<T: Positioned> Execute<SyncContext, SyncError> for UpdateItem<T> {
    type Output = ();

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<(), SyncError> {
        let started = Instant::now();
        let input = json!({
            "container": self.scope.describe(),
            "id": self.id,
            "patch": self.patch,
        });
        let result = ctx
            .adapter::<T>()
            .update(&self.scope, &self.id, &self.patch)
            .await;
        ExecutionResult::record(self, input, started, result, |_| json!({ "updated": true }))
    }
}

/// Remove an item from its container
#[derive(Debug, Clone)]
pub struct DeleteItem<T: Positioned> {
    pub scope: T::Scope,
    pub id: String,
    _kind: std::marker::PhantomData<fn() -> T>,
}

impl<T: Positioned> DeleteItem<T> {
    pub fn new(scope: T::Scope, id: impl Into<String>) -> Self {
        Self {
            scope,
            id: id.into(),
            _kind: std::marker::PhantomData,
        }
    }
}

impl<T: Positioned> Operation for DeleteItem<T> {
    fn verb(&self) -> &'static str {
        "delete"
    }

    fn noun(&self) -> &'static str {
        T::NOUN
    }

    fn description(&self) -> &'static str {
        "Delete an item"
    }
}

#[async_trait]
impl<T: Positioned> Execute<SyncContext, SyncError> for DeleteItem<T> {
    type Output = ();

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<(), SyncError> {
        let started = Instant::now();
        let input = json!({ "container": self.scope.describe(), "id": self.id });
        let result = ctx.adapter::<T>().delete(&self.scope, &self.id).await;
        ExecutionResult::record(self, input, started, result, |_| json!({ "deleted": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::types::{BoardScope, ChecklistItem, Column};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_update_delete_checklist_item() {
        let ctx = SyncContext::new(Arc::new(MemoryStore::new()));
        let scope = BoardScope::new("t1", "b1").column("c1").task("k1");

        let first = AddItem::new(scope.clone(), ChecklistItem::new("milk"))
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let second = AddItem::new(scope.clone(), ChecklistItem::new("eggs"))
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!((first.position, second.position), (0, 1));

        UpdateItem::<ChecklistItem>::new(scope.clone(), first.id.as_str(), Patch::new().set("done", true))
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let cached = ctx
            .checklist_cache()
            .find(&scope.cache_key(), first.id.as_str())
            .unwrap();
        assert!(cached.done);

        DeleteItem::<ChecklistItem>::new(scope.clone(), first.id.as_str())
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(ctx.checklist_cache().get(&scope.cache_key()).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_is_logged_as_error() {
        let store = Arc::new(MemoryStore::new());
        let ctx = SyncContext::new(store.clone());
        store.fail_next_writes(1);

        let result = AddItem::new(BoardScope::new("t1", "b1"), Column::new("Todo"))
            .execute(&ctx)
            .await;
        let (value, entry) = result.split();
        assert!(value.unwrap_err().is_remote());
        assert!(entry.unwrap().is_error());
    }
}

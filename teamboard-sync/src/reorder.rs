//! ReorderItems command - same-container drag

use crate::adapter::write_positions;
use crate::cache::LocalCache;
use crate::config::ConflictPolicy;
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::position::{changed_positions, index_of, reindex_after_move};
use crate::remote::{decode_all, Query, RemoteStore};
use crate::settle::{DropOutcome, IgnoreReason, Optimistic, Settlement};
use crate::types::{CollectionPath, ContainerKey, ContainerScope, Positioned};
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use teamboard_operations::{async_trait, Execute, ExecutionResult, Operation};

/// Reorder result: the new local order now, the number of position writes later
pub type ReorderOutcome<T> = DropOutcome<Vec<T>, usize>;

/// Move an item to another index within its container
#[derive(Debug, Clone)]
pub struct ReorderItems<T: Positioned> {
    pub scope: T::Scope,
    pub active_id: String,
    pub over_id: Option<String>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Positioned> ReorderItems<T> {
    /// Drop `active_id` on `over_id`; `None` means released outside any target
    pub fn new(scope: T::Scope, active_id: impl Into<String>, over_id: Option<String>) -> Self {
        Self {
            scope,
            active_id: active_id.into(),
            over_id,
            _kind: PhantomData,
        }
    }

    fn input(&self) -> Value {
        json!({
            "container": self.scope.describe(),
            "active": self.active_id,
            "over": self.over_id,
        })
    }

    /// Apply locally and start the remote phase
    fn apply(&self, ctx: &SyncContext) -> Result<ReorderOutcome<T>> {
        let over_id = match &self.over_id {
            None => return Ok(DropOutcome::Ignored(IgnoreReason::NoTarget)),
            Some(id) if *id == self.active_id => {
                return Ok(DropOutcome::Ignored(IgnoreReason::SameItem))
            }
            Some(id) => id,
        };

        let collection = self
            .scope
            .collection()
            .ok_or_else(|| SyncError::missing_parent(self.scope.describe()))?;
        let cache = T::cache(ctx);
        let key = self.scope.cache_key();
        let base = cache.ordered(&key);

        let Some(from) = index_of(&base, &self.active_id) else {
            return Ok(DropOutcome::Ignored(IgnoreReason::NotInContainer));
        };
        let Some(to) = index_of(&base, over_id) else {
            return Ok(DropOutcome::Ignored(IgnoreReason::NotInContainer));
        };

        let reordered = reindex_after_move(&base, from, to);
        let writes = changed_positions(&base, &reordered);
        cache.set_all(&key, reordered.clone());
        tracing::debug!(
            "reordered {} {} in {}: {} -> {}, {} writes",
            T::NOUN,
            self.active_id,
            key,
            from,
            to,
            writes.len()
        );

        let settlement = Settlement::spawn(
            format!("reorder {} in {}", T::NOUN, key),
            settle_reorder(
                Arc::clone(ctx.store()),
                ctx.config().conflict_policy,
                collection,
                Arc::clone(cache),
                key,
                base,
                writes,
            ),
        );

        Ok(DropOutcome::Applied(Optimistic {
            applied_locally: reordered,
            remote_settled: settlement,
        }))
    }
}

impl<T: Positioned> Operation for ReorderItems<T> {
    fn verb(&self) -> &'static str {
        "reorder"
    }

    fn noun(&self) -> &'static str {
        T::NOUN
    }

    fn description(&self) -> &'static str {
        "Move an item to another index within its container"
    }
}

#[async_trait]
impl<T: Positioned> Execute<SyncContext, SyncError> for ReorderItems<T> {
    type Output = ReorderOutcome<T>;

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<ReorderOutcome<T>, SyncError> {
        let started = Instant::now();
        match self.apply(ctx) {
            Ok(DropOutcome::Ignored(reason)) => {
                tracing::debug!("reorder of {} ignored: {}", self.active_id, reason);
                ExecutionResult::Unlogged {
                    value: DropOutcome::Ignored(reason),
                }
            }
            result => ExecutionResult::record(self, self.input(), started, result, |outcome| {
                let order: Vec<&str> = outcome
                    .applied_locally()
                    .map(|items| items.iter().map(|item| item.id()).collect())
                    .unwrap_or_default();
                json!({ "order": order })
            }),
        }
    }
}

/// Whether two sequences have the same ids at the same positions
fn same_layout<T: Positioned>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.id() == y.id() && x.position() == y.position())
}

async fn settle_reorder<T: Positioned>(
    store: Arc<dyn RemoteStore>,
    policy: ConflictPolicy,
    collection: CollectionPath,
    cache: Arc<LocalCache<T>>,
    key: ContainerKey,
    base: Vec<T>,
    writes: Vec<(String, usize)>,
) -> Result<usize> {
    if policy == ConflictPolicy::RejectStale {
        let docs = store.query(&Query::by_position(collection.clone())).await?;
        let remote: Vec<T> = decode_all(&docs);
        if !same_layout(&base, &remote) {
            tracing::warn!("{} changed remotely, dropping reorder", collection);
            cache.set_all(&key, remote);
            return Err(SyncError::StaleContainer {
                container: collection.to_string(),
            });
        }
    }

    write_positions(store.as_ref(), &collection, &writes).await
}

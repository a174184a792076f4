//! CompactItems command - close position gaps in a container

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::types::{ContainerScope, Positioned};
use serde_json::json;
use std::marker::PhantomData;
use std::time::Instant;
use teamboard_operations::{async_trait, Execute, ExecutionResult, Operation};

/// Renumber a container to `0..N-1`, remotely and in the cache.
///
/// Appends use `max + 1` and deletes leave holes, so positions drift sparse unless
/// something renumbers. Run this on demand, or set
/// [`CompactionPolicy::AfterDelete`](crate::config::CompactionPolicy::AfterDelete).
#[derive(Debug, Clone)]
pub struct CompactItems<T: Positioned> {
    pub scope: T::Scope,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Positioned> CompactItems<T> {
    pub fn new(scope: T::Scope) -> Self {
        Self {
            scope,
            _kind: PhantomData,
        }
    }
}

impl<T: Positioned> Operation for CompactItems<T> {
    fn verb(&self) -> &'static str {
        "compact"
    }

    fn noun(&self) -> &'static str {
        T::NOUN
    }

    fn description(&self) -> &'static str {
        "Renumber a container densely"
    }
}

#[async_trait]
impl<T: Positioned> Execute<SyncContext, SyncError> for CompactItems<T> {
    type Output = usize;

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<usize, SyncError> {
        let started = Instant::now();
        match ctx.adapter::<T>().compact(&self.scope).await {
            Ok(0) => ExecutionResult::Unlogged { value: 0 },
            result => ExecutionResult::record(
                self,
                json!({ "container": self.scope.describe() }),
                started,
                result,
                |written| json!({ "written": written }),
            ),
        }
    }
}

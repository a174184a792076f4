//! Operation processor that records activity

use crate::context::SyncContext;
use crate::error::SyncError;
use teamboard_operations::{async_trait, Execute, OperationProcessor};

/// Runs operations against a [`SyncContext`] and appends their log entries to the
/// context's activity log, stamped with the actor if one is set.
#[derive(Debug, Clone, Default)]
pub struct BoardOperationProcessor {
    actor: Option<String>,
}

impl BoardOperationProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute every logged operation to `actor`
    pub fn with_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
        }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[async_trait]
impl OperationProcessor<SyncContext, SyncError> for BoardOperationProcessor {
    async fn process<O>(&self, operation: &O, ctx: &SyncContext) -> Result<O::Output, SyncError>
    where
        O: Execute<SyncContext, SyncError>,
    {
        let (result, log_entry) = operation.execute(ctx).await.split();

        if let Some(mut entry) = log_entry {
            if let Some(actor) = &self.actor {
                entry = entry.with_actor(actor.clone());
            }
            ctx.record_activity(entry);
        }

        result
    }
}

//! The operation traits

use crate::ExecutionResult;
use async_trait::async_trait;

/// Static metadata describing an operation.
///
/// The canonical op string (`"<verb> <noun>"`) is what ends up in the activity log.
pub trait Operation {
    /// Action word, e.g. `"reorder"` or `"move"`
    fn verb(&self) -> &'static str;

    /// Thing acted on, e.g. `"task"` or `"checklist item"`
    fn noun(&self) -> &'static str;

    /// One line of human readable help
    fn description(&self) -> &'static str;

    fn op_string(&self) -> String {
        format!("{} {}", self.verb(), self.noun())
    }
}

/// An operation that can run against a context `C`, failing with `E`.
#[async_trait]
pub trait Execute<C, E>: Operation + Send + Sync
where
    C: Send + Sync,
    E: Send,
{
    /// What a successful execution produces
    type Output: Send;

    async fn execute(&self, ctx: &C) -> ExecutionResult<Self::Output, E>;
}

/// Runs operations and decides what happens to their log entries.
#[async_trait]
pub trait OperationProcessor<C, E>: Send + Sync
where
    C: Send + Sync,
    E: Send,
{
    async fn process<O>(&self, operation: &O, ctx: &C) -> Result<O::Output, E>
    where
        O: Execute<C, E>;
}

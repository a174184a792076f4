//! # Teamboard Operations
//!
//! This crate provides the `Operation` and `Execute` traits used by every mutating
//! command of the board sync engine. An operation is a struct whose fields are its
//! parameters; executing it against a context yields an [`ExecutionResult`] that
//! says whether the call should be recorded in the activity log.
//!
//! ## Example
//!
//! ```ignore
//! use teamboard_operations::*;
//!
//! pub struct CompactItems { pub container: String }
//!
//! impl Operation for CompactItems {
//!     fn verb(&self) -> &'static str { "compact" }
//!     fn noun(&self) -> &'static str { "container" }
//!     fn description(&self) -> &'static str { "Renumber positions densely" }
//! }
//!
//! #[async_trait]
//! impl Execute<SyncContext, SyncError> for CompactItems {
//!     type Output = usize;
//!     async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<usize, SyncError> {
//!         // returns ExecutionResult::Logged, Unlogged or Failed
//!     }
//! }
//! ```

mod execution_result;
mod log;
mod operation;

pub use execution_result::ExecutionResult;
pub use log::LogEntry;
pub use operation::{Execute, Operation, OperationProcessor};

// Re-export for use in implementations
pub use async_trait::async_trait;
pub use serde_json::Value;

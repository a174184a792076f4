//! Ordered-list sync engine for team kanban boards
//!
//! This crate keeps positioned items (columns, tasks, checklist items) consistent
//! between a hosted document store and an in-memory cache that the UI renders from.
//! Every drag gesture is applied to the cache first and settled remotely afterwards.
//!
//! ## Overview
//!
//! - **Dense positions** - Reorders and moves renumber a container to `0..N-1`
//! - **Two-phase drops** - A drop returns what was applied locally plus a handle on
//!   the remote writes still in flight
//! - **Recoverable moves** - Cross-column moves leave a marker until they finish, so an
//!   interrupted move is replayed on the next board load
//! - **Push-driven cache** - Subscriptions overwrite the cache with every remote snapshot
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teamboard_sync::{
//!     items::AddItem, remote::MemoryStore, BoardScope, Column, Execute, SyncContext,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = SyncContext::new(Arc::new(MemoryStore::new()));
//! let board = BoardScope::new("team-1", "board-1");
//!
//! let todo = AddItem::new(board.clone(), Column::new("Todo"))
//!     .execute(&ctx)
//!     .await
//!     .into_result()?;
//! assert_eq!(todo.position, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Document Layout
//!
//! ```text
//! users/{user}
//! teams/{team}
//! └── boards/{board}
//!     ├── pendingMoves/{marker}
//!     └── columns/{column}
//!         └── tasks/{task}
//!             └── checkListItem/{item}
//! ```
//!
//! Documents store camelCase fields. Ids live in the document path, never in the body.

pub mod adapter;
pub mod cache;
pub mod checklist;
pub mod compact;
pub mod config;
mod context;
pub mod dnd;
mod error;
pub mod items;
pub mod membership;
pub mod position;
mod processor;
pub mod remote;
pub mod reorder;
pub mod settle;
pub mod task;
pub mod types;

// Re-export Execute trait and types from operations crate
pub use teamboard_operations::{
    async_trait, Execute, ExecutionResult, LogEntry, Operation, OperationProcessor,
};

pub use config::{CompactionPolicy, ConflictPolicy, SyncConfig};
pub use context::{SyncContext, ACTIVITY_LIMIT};
pub use error::{MoveStage, Result, SyncError};
pub use processor::BoardOperationProcessor;

// Re-export commonly used types
pub use types::{
    Board, BoardId, BoardScope, ChecklistItem, ChecklistItemId, Column, ColumnId, ColumnScope,
    CurrentUser, DragEnd, DragHandle, DropTarget, MoveToken, Patch, Task, TaskId, TaskScope, Team,
    TeamId, UserId,
};

//! Core types for the board sync engine

mod drag;
mod ids;
mod item;
mod path;
mod records;

// Re-export all types
pub use drag::{DragEnd, DragHandle, DragSession, DragState, DropTarget};
pub use ids::{BoardId, ChecklistItemId, ColumnId, MoveToken, TaskId, TeamId, UserId};
pub use item::{ChecklistItem, Column, Patch, Positioned, Record, Task};
pub use path::{
    BoardScope, CollectionPath, ColumnScope, ContainerKey, ContainerScope, DocPath, TaskScope,
    BOARDS, CHECKLIST, COLUMNS, PENDING_MOVES, TASKS, TEAMS, USERS,
};
pub use records::{Board, CurrentUser, PendingMove, Team, User};

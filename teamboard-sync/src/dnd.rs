//! Drag-end entry points for the UI
//!
//! The UI reports a finished gesture as a [`DragEnd`]: the dragged handle and what it
//! was released over. The handler turns that into a reorder or a cross-column move and
//! runs it through the processor so it lands in the activity log.

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::processor::BoardOperationProcessor;
use crate::reorder::{ReorderItems, ReorderOutcome};
use crate::settle::{DropOutcome, IgnoreReason};
use crate::task::{MoveOutcome, MoveReport, MoveTask};
use crate::types::{BoardScope, ChecklistItem, Column, ColumnId, DragEnd, DropTarget, Positioned, Task};
use teamboard_operations::OperationProcessor;

/// What a task drop turned into
#[derive(Debug)]
pub enum TaskDropOutcome {
    Reorder(ReorderOutcome<Task>),
    Move(MoveOutcome),
}

/// Settled result of a task drop
#[derive(Debug)]
pub enum TaskDropSettled {
    Ignored,
    Reordered(usize),
    Moved(MoveReport),
}

impl TaskDropOutcome {
    pub fn is_applied(&self) -> bool {
        match self {
            Self::Reorder(outcome) => outcome.is_applied(),
            Self::Move(outcome) => outcome.is_applied(),
        }
    }

    pub fn ignored_reason(&self) -> Option<IgnoreReason> {
        match self {
            Self::Reorder(outcome) => outcome.ignored_reason(),
            Self::Move(outcome) => outcome.ignored_reason(),
        }
    }

    /// Wait for the remote phase
    pub async fn settle(self) -> Result<TaskDropSettled> {
        let settled = match self {
            Self::Reorder(outcome) => outcome.settle().await?.map(TaskDropSettled::Reordered),
            Self::Move(outcome) => outcome.settle().await?.map(TaskDropSettled::Moved),
        };
        Ok(settled.unwrap_or(TaskDropSettled::Ignored))
    }
}

/// Routes drag-end events of one board
pub struct DragDropHandler<P = BoardOperationProcessor> {
    board: BoardScope,
    processor: P,
}

impl DragDropHandler<BoardOperationProcessor> {
    pub fn new(board: BoardScope) -> Self {
        Self::with_processor(board, BoardOperationProcessor::new())
    }
}

impl<P> DragDropHandler<P>
where
    P: OperationProcessor<SyncContext, SyncError>,
{
    pub fn with_processor(board: BoardScope, processor: P) -> Self {
        Self { board, processor }
    }

    pub fn board(&self) -> &BoardScope {
        &self.board
    }

    /// Reorder within a single container. Items never leave it.
    async fn reorder_within<T: Positioned>(
        &self,
        ctx: &SyncContext,
        scope: T::Scope,
        event: &DragEnd,
    ) -> Result<ReorderOutcome<T>> {
        let over = match event.check() {
            Ok(over) => over,
            Err(reason) => return Ok(DropOutcome::Ignored(reason)),
        };
        if event.is_cross_container() {
            return Ok(DropOutcome::Ignored(IgnoreReason::CrossContainer));
        }

        let op = match over {
            DropTarget::Item(handle) => {
                ReorderItems::<T>::new(scope, event.active.id.clone(), Some(handle.id.clone()))
            }
            // Empty space of the item's own container resolves to no index.
            DropTarget::Container { .. } => {
                return Ok(DropOutcome::Ignored(IgnoreReason::NotInContainer))
            }
        };
        self.processor.process(&op, ctx).await
    }

    /// Column dragged along the board
    pub async fn on_column_drag_end(
        &self,
        ctx: &SyncContext,
        event: &DragEnd,
    ) -> Result<ReorderOutcome<Column>> {
        self.reorder_within::<Column>(ctx, self.board.clone(), event)
            .await
    }

    /// Task dragged within its column or into another one
    pub async fn on_task_drag_end(
        &self,
        ctx: &SyncContext,
        event: &DragEnd,
    ) -> Result<TaskDropOutcome> {
        let over = match event.check() {
            Ok(over) => over,
            Err(reason) => return Ok(TaskDropOutcome::Reorder(DropOutcome::Ignored(reason))),
        };

        if !event.is_cross_container() {
            let scope = self.board.column(event.active.container.as_str());
            return self
                .reorder_within::<Task>(ctx, scope, event)
                .await
                .map(TaskDropOutcome::Reorder);
        }

        let mut op = MoveTask::new(
            self.board.clone(),
            event.active.id.as_str(),
            event.active.container.as_str(),
            over.container_key().as_str(),
        );
        if let Some(id) = over.item_id() {
            op = op.over(id);
        }
        self.processor
            .process(&op, ctx)
            .await
            .map(TaskDropOutcome::Move)
    }

    /// Checklist item dragged within the checklist of a task in `column`
    pub async fn on_checklist_drag_end(
        &self,
        ctx: &SyncContext,
        column: &ColumnId,
        event: &DragEnd,
    ) -> Result<ReorderOutcome<ChecklistItem>> {
        let scope = self
            .board
            .column(column.clone())
            .task(event.active.container.as_str());
        self.reorder_within::<ChecklistItem>(ctx, scope, event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::types::{ContainerScope, DragHandle, Record};
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryStore>, SyncContext, DragDropHandler) {
        let store = Arc::new(MemoryStore::new());
        let board = BoardScope::new("t1", "b1");
        for (i, id) in ["todo", "doing", "done"].iter().enumerate() {
            let mut column = Column::new(*id);
            column.set_id(id);
            column.position = i;
            store.seed(&board.collection().unwrap(), &column).unwrap();
        }
        for (i, id) in ["T1", "T2"].iter().enumerate() {
            let mut task = Task::new(*id);
            task.set_id(id);
            task.column_id = ColumnId::from("todo");
            task.position = i;
            store
                .seed(&board.column("todo").collection().unwrap(), &task)
                .unwrap();
        }
        let ctx = SyncContext::new(store.clone());
        ctx.adapter::<Column>().fetch_all(&board).await.unwrap();
        ctx.adapter::<Task>()
            .fetch_all(&board.column("todo"))
            .await
            .unwrap();
        (store, ctx, DragDropHandler::new(board))
    }

    #[tokio::test]
    async fn test_column_drag() {
        let (_store, ctx, handler) = setup().await;
        let event = DragEnd::new(
            DragHandle::new("done", "b1"),
            Some(DropTarget::item("todo", "b1")),
        );
        let outcome = handler.on_column_drag_end(&ctx, &event).await.unwrap();
        let order: Vec<_> = outcome
            .applied_locally()
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(order, vec!["done", "todo", "doing"]);
        assert_eq!(outcome.settle().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_task_drag_dispatch() {
        let (_store, ctx, handler) = setup().await;

        let same_column = DragEnd::new(
            DragHandle::new("T1", "todo"),
            Some(DropTarget::item("T2", "todo")),
        );
        let outcome = handler.on_task_drag_end(&ctx, &same_column).await.unwrap();
        assert!(matches!(outcome, TaskDropOutcome::Reorder(_)));
        assert!(matches!(
            outcome.settle().await.unwrap(),
            TaskDropSettled::Reordered(2)
        ));

        let into_empty = DragEnd::new(
            DragHandle::new("T1", "todo"),
            Some(DropTarget::container("doing")),
        );
        let outcome = handler.on_task_drag_end(&ctx, &into_empty).await.unwrap();
        assert!(matches!(outcome, TaskDropOutcome::Move(_)));
        match outcome.settle().await.unwrap() {
            TaskDropSettled::Moved(report) => {
                assert_eq!(report.target.len(), 1);
                assert_eq!(report.target[0].title, "T1");
                assert_eq!(report.source.len(), 1);
            }
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_drops_write_nothing() {
        let (store, ctx, handler) = setup().await;

        let on_itself = DragEnd::new(
            DragHandle::new("T1", "todo"),
            Some(DropTarget::item("T1", "todo")),
        );
        let outside = DragEnd::new(DragHandle::new("T1", "todo"), None);
        for event in [on_itself, outside] {
            let outcome = handler.on_task_drag_end(&ctx, &event).await.unwrap();
            assert!(!outcome.is_applied());
        }

        let column_elsewhere = DragEnd::new(
            DragHandle::new("todo", "b1"),
            Some(DropTarget::container("b2")),
        );
        let outcome = handler
            .on_column_drag_end(&ctx, &column_elsewhere)
            .await
            .unwrap();
        assert_eq!(outcome.ignored_reason(), Some(IgnoreReason::CrossContainer));

        assert_eq!(store.write_count(), 0);
        assert!(ctx.activity().is_empty());
    }

    #[tokio::test]
    async fn test_drop_on_own_column_background_is_ignored() {
        let (store, ctx, handler) = setup().await;
        let before = ctx.task_cache().revision();

        let event = DragEnd::new(
            DragHandle::new("T1", "todo"),
            Some(DropTarget::container("todo")),
        );
        let outcome = handler.on_task_drag_end(&ctx, &event).await.unwrap();
        assert_eq!(outcome.ignored_reason(), Some(IgnoreReason::NotInContainer));

        let column_on_board = DragEnd::new(
            DragHandle::new("todo", "b1"),
            Some(DropTarget::container("b1")),
        );
        let outcome = handler
            .on_column_drag_end(&ctx, &column_on_board)
            .await
            .unwrap();
        assert_eq!(outcome.ignored_reason(), Some(IgnoreReason::NotInContainer));

        assert_eq!(ctx.task_cache().revision(), before);
        assert_eq!(store.write_count(), 0);
    }
}

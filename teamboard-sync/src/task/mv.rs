//! MoveTask command - cross-column drag

use super::protocol::{MoveProtocol, MoveReport};
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::position::{index_of, insert_at, renumber};
use crate::settle::{DropOutcome, IgnoreReason, Optimistic, Settlement};
use crate::types::{BoardScope, ColumnId, ContainerScope, MoveToken, PendingMove, Task, TaskId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use teamboard_operations::{async_trait, Execute, ExecutionResult, Operation};

/// Both columns as shown right after the drop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovePreview {
    pub token: MoveToken,
    pub source: Vec<Task>,
    pub target: Vec<Task>,
}

/// Move result: the optimistic columns now, the settled move later
pub type MoveOutcome = DropOutcome<MovePreview, MoveReport>;

/// Move a task into another column of the same board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveTask {
    pub board: BoardScope,
    pub task: TaskId,
    pub source: ColumnId,
    pub target: ColumnId,
    /// Task in the target column the card was dropped on; it takes that index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over: Option<TaskId>,
    /// Explicit index in the target column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl MoveTask {
    /// Move to the end of `target`
    pub fn new(
        board: BoardScope,
        task: impl Into<TaskId>,
        source: impl Into<ColumnId>,
        target: impl Into<ColumnId>,
    ) -> Self {
        Self {
            board,
            task: task.into(),
            source: source.into(),
            target: target.into(),
            over: None,
            index: None,
        }
    }

    /// Take the index of `over` in the target column
    pub fn over(mut self, over: impl Into<TaskId>) -> Self {
        self.over = Some(over.into());
        self
    }

    /// Insert at `index` in the target column (clamped to the end)
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    fn apply(&self, ctx: &SyncContext) -> Result<MoveOutcome> {
        if self.source == self.target {
            return Ok(DropOutcome::Ignored(IgnoreReason::SameContainer));
        }
        if self.over.as_ref() == Some(&self.task) {
            return Ok(DropOutcome::Ignored(IgnoreReason::SameItem));
        }
        if self.task.is_empty() {
            return Err(SyncError::missing_parent("task id"));
        }

        let source = self.board.column(self.source.clone());
        let target = self.board.column(self.target.clone());
        super::protocol::resolve(&source, &target)?;

        let cache = ctx.task_cache();
        let source_items = cache.ordered(&source.cache_key());
        let target_items = cache.ordered(&target.cache_key());

        let Some(from) = index_of(&source_items, self.task.as_str()) else {
            return Ok(DropOutcome::Ignored(IgnoreReason::NotInContainer));
        };
        let insert_index = match (&self.over, self.index) {
            (Some(over), _) => match index_of(&target_items, over.as_str()) {
                Some(index) => index,
                None => return Ok(DropOutcome::Ignored(IgnoreReason::NotInContainer)),
            },
            (None, Some(index)) => index.min(target_items.len()),
            (None, None) => target_items.len(),
        };

        let mut remaining = source_items;
        let mut moved = remaining.remove(from);
        moved.column_id = self.target.clone();
        let source_preview = renumber(remaining);
        let target_preview = insert_at(&target_items, moved, insert_index);
        cache.set_all(&source.cache_key(), source_preview.clone());
        cache.set_all(&target.cache_key(), target_preview.clone());

        let token = MoveToken::new();
        tracing::debug!(
            "task {} moved locally {} -> {} at {}, token {}",
            self.task,
            self.source,
            self.target,
            insert_index,
            token
        );

        let mut marker = PendingMove {
            id: String::new(),
            token: token.clone(),
            task_id: self.task.clone(),
            source_column: self.source.clone(),
            target_column: self.target.clone(),
            insert_index,
            created_at: Utc::now(),
        };
        let protocol = MoveProtocol::new(ctx);
        let board = self.board.clone();
        let settlement = Settlement::spawn(format!("move task {}", self.task), async move {
            protocol.mark(&board, &mut marker).await?;
            protocol.run(&board, &marker).await
        });

        Ok(DropOutcome::Applied(Optimistic {
            applied_locally: MovePreview {
                token,
                source: source_preview,
                target: target_preview,
            },
            remote_settled: settlement,
        }))
    }
}

impl Operation for MoveTask {
    fn verb(&self) -> &'static str {
        "move"
    }

    fn noun(&self) -> &'static str {
        "task"
    }

    fn description(&self) -> &'static str {
        "Move a task to a different column"
    }
}

#[async_trait]
impl Execute<SyncContext, SyncError> for MoveTask {
    type Output = MoveOutcome;

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<MoveOutcome, SyncError> {
        let started = Instant::now();
        match self.apply(ctx) {
            Ok(DropOutcome::Ignored(reason)) => {
                tracing::debug!("move of task {} ignored: {}", self.task, reason);
                ExecutionResult::Unlogged {
                    value: DropOutcome::Ignored(reason),
                }
            }
            result => {
                let input = serde_json::to_value(self).unwrap_or(Value::Null);
                ExecutionResult::record(self, input, started, result, |outcome| {
                    match outcome.applied_locally() {
                        Some(preview) => json!({
                            "token": preview.token,
                            "target": preview.target.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
                        }),
                        None => Value::Null,
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryStore, RemoteStore};
    use crate::types::{ChecklistItem, Column, ContainerKey, Record};
    use std::sync::Arc;

    fn board() -> BoardScope {
        BoardScope::new("t1", "b1")
    }

    fn seed_task(store: &MemoryStore, column: &str, id: &str, position: usize) {
        let mut task = Task::new(id);
        task.set_id(id);
        task.column_id = ColumnId::from(column);
        task.position = position;
        store
            .seed(&board().column(column).collection().unwrap(), &task)
            .unwrap();
    }

    async fn setup() -> (Arc<MemoryStore>, SyncContext) {
        let store = Arc::new(MemoryStore::new());
        for column in ["todo", "done"] {
            let mut col = Column::new(column);
            col.set_id(column);
            store.seed(&board().collection().unwrap(), &col).unwrap();
        }
        seed_task(&store, "todo", "T1", 0);
        seed_task(&store, "todo", "T2", 1);
        seed_task(&store, "done", "U1", 0);

        let ctx = SyncContext::new(store.clone());
        for column in ["todo", "done"] {
            ctx.adapter::<Task>()
                .fetch_all(&board().column(column))
                .await
                .unwrap();
        }
        (store, ctx)
    }

    fn titles(tasks: &[Task]) -> Vec<(String, usize)> {
        tasks.iter().map(|t| (t.title.clone(), t.position)).collect()
    }

    fn pairs(rows: &[(&str, usize)]) -> Vec<(String, usize)> {
        rows.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    #[tokio::test]
    async fn test_move_after_last_item() {
        let (store, ctx) = setup().await;

        let outcome = MoveTask::new(board(), "T1", "todo", "done")
            .at_index(1)
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let preview = outcome.applied_locally().unwrap();
        assert_eq!(titles(&preview.source), pairs(&[("T2", 0)]));
        assert_eq!(titles(&preview.target), pairs(&[("U1", 0), ("T1", 1)]));

        let report = outcome.settle().await.unwrap().unwrap();
        assert_eq!(titles(&report.source), pairs(&[("T2", 0)]));
        assert_eq!(titles(&report.target), pairs(&[("U1", 0), ("T1", 1)]));
        assert_ne!(report.task_id.as_str(), "T1");

        let moved = &report.target[1];
        assert_eq!(moved.column_id.as_str(), "done");
        assert_eq!(moved.move_token.as_ref(), Some(&report.token));

        // Marker is gone, source document is gone.
        assert!(store.documents(&board().pending_moves().unwrap()).is_empty());
        assert!(store
            .document(&board().column("todo").collection().unwrap().doc("T1"))
            .is_none());

        let cached = ctx.task_cache().ordered(&ContainerKey::from("done"));
        assert_eq!(titles(&cached), pairs(&[("U1", 0), ("T1", 1)]));
    }

    #[tokio::test]
    async fn test_drop_on_item_takes_its_index() {
        let (_store, ctx) = setup().await;
        let outcome = MoveTask::new(board(), "T2", "todo", "done")
            .over("U1")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let report = outcome.settle().await.unwrap().unwrap();
        assert_eq!(titles(&report.target), pairs(&[("T2", 0), ("U1", 1)]));
        assert_eq!(titles(&report.source), pairs(&[("T1", 0)]));
    }

    #[tokio::test]
    async fn test_checklist_travels_with_task() {
        let (store, ctx) = setup().await;
        let checklist = board().column("todo").task("T1").collection().unwrap();
        for (i, text) in ["one", "two"].iter().enumerate() {
            let mut item = ChecklistItem::new(*text);
            item.set_id(text);
            item.position = i;
            store.seed(&checklist, &item).unwrap();
        }

        let outcome = MoveTask::new(board(), "T1", "todo", "done")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let report = outcome.settle().await.unwrap().unwrap();
        assert_eq!(report.checklist_copied, 2);

        let copied = board()
            .column("done")
            .task(report.task_id.clone())
            .collection()
            .unwrap();
        assert_eq!(store.documents(&copied).len(), 2);
        assert!(store.documents(&checklist).is_empty());
        assert_eq!(
            ctx.checklist_cache()
                .get(&ContainerKey::new(report.task_id.as_str()))
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_tied_checklist_items_with_same_text_all_travel() {
        let (store, ctx) = setup().await;
        let checklist = board().column("todo").task("T1").collection().unwrap();
        for id in ["a", "b"] {
            let mut item = ChecklistItem::new("Review");
            item.set_id(id);
            store.seed(&checklist, &item).unwrap();
        }

        let report = MoveTask::new(board(), "T1", "todo", "done")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap()
            .settle()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.checklist_copied, 2);

        let copied = board()
            .column("done")
            .task(report.task_id.clone())
            .collection()
            .unwrap();
        let docs = store.documents(&copied);
        assert_eq!(docs.len(), 2);
        let mut origins: Vec<String> = docs
            .iter()
            .map(|doc| doc.data["copiedFrom"].as_str().unwrap().to_string())
            .collect();
        origins.sort();
        assert_eq!(origins, vec!["a", "b"]);
        assert!(store.documents(&checklist).is_empty());
    }

    #[tokio::test]
    async fn test_ignored_moves() {
        let (store, ctx) = setup().await;

        let same = MoveTask::new(board(), "T1", "todo", "todo")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(same.ignored_reason(), Some(IgnoreReason::SameContainer));

        let stranger = MoveTask::new(board(), "ghost", "todo", "done")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(stranger.ignored_reason(), Some(IgnoreReason::NotInContainer));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_after_marker_is_partial_move() {
        let (store, ctx) = setup().await;
        store.fail_writes_under(board().column("todo").collection().unwrap().as_str());

        let outcome = MoveTask::new(board(), "T1", "todo", "done")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let err = outcome.settle().await.unwrap_err();
        match err {
            SyncError::PartialMove { stage, .. } => {
                assert_eq!(stage, crate::error::MoveStage::Delete)
            }
            other => panic!("expected PartialMove, got {other:?}"),
        }

        // The marker survives for recovery.
        let markers = store
            .query(&crate::remote::Query::collection(board().pending_moves().unwrap()))
            .await
            .unwrap();
        assert_eq!(markers.len(), 1);
    }

    #[tokio::test]
    async fn test_marker_failure_is_plain_remote_error() {
        let (store, ctx) = setup().await;
        store.fail_writes_under(board().pending_moves().unwrap().as_str());

        let outcome = MoveTask::new(board(), "T1", "todo", "done")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let err = outcome.settle().await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { .. }));
        assert_eq!(store.write_count(), 0);
    }
}

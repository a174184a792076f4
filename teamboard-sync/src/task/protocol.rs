//! Cross-column move protocol
//!
//! The store has no atomic move, so a task changes column by copy-then-delete. A
//! pending-move marker is written first and removed last; every step in between is
//! idempotent, so replaying a marker after a crash converges on the same result:
//!
//! 1. copy the task into the target column, tagged with the move token (skipped if a
//!    copy with that token already exists)
//! 2. copy the checklist sub-collection (skipping items already copied)
//! 3. delete the source checklist and the source task
//! 4. renumber both columns densely
//! 5. delete the marker

use crate::adapter::write_positions;
use crate::cache::LocalCache;
use crate::context::SyncContext;
use crate::error::{MoveStage, Result, SyncError};
use crate::position::{changed_positions, insert_at, renumber, sort_by_position};
use crate::remote::{decode_all, Document, Filter, Query, RemoteStore};
use crate::types::{
    BoardScope, ChecklistItem, CollectionPath, ContainerKey, ContainerScope, DocPath, MoveToken,
    PendingMove, Record, Task, TaskId, CHECKLIST,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// What a settled move did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    pub token: MoveToken,
    /// Id of the task document in the target column
    pub task_id: TaskId,
    /// Final order of the source column
    pub source: Vec<Task>,
    /// Final order of the target column
    pub target: Vec<Task>,
    pub checklist_copied: usize,
    pub position_writes: usize,
}

/// Attach the protocol stage to a failure
fn at<T>(token: &MoveToken, stage: MoveStage, result: Result<T>) -> Result<T> {
    result.map_err(|e| SyncError::partial_move(token.as_str(), stage, &e))
}

pub(crate) struct MoveProtocol {
    store: Arc<dyn RemoteStore>,
    tasks: Arc<LocalCache<Task>>,
    checklist: Arc<LocalCache<ChecklistItem>>,
    copy_checklist: bool,
}

impl MoveProtocol {
    pub(crate) fn new(ctx: &SyncContext) -> Self {
        Self {
            store: Arc::clone(ctx.store()),
            tasks: Arc::clone(ctx.task_cache()),
            checklist: Arc::clone(ctx.checklist_cache()),
            copy_checklist: ctx.config().copy_checklist_on_move,
        }
    }

    pub(crate) fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    /// Persist the marker. Nothing else has been written yet, so failures here are
    /// plain remote errors.
    pub(crate) async fn mark(&self, board: &BoardScope, marker: &mut PendingMove) -> Result<()> {
        let collection = board
            .pending_moves()
            .ok_or_else(|| SyncError::missing_parent(board.describe()))?;
        let id = self
            .store
            .create(&collection, Document::encode(marker)?)
            .await?;
        marker.set_id(&id);
        tracing::info!(
            "move {} of task {} marked: {} -> {}",
            marker.token,
            marker.task_id,
            marker.source_column,
            marker.target_column
        );
        Ok(())
    }

    /// Run every step after the marker
    pub(crate) async fn run(&self, board: &BoardScope, marker: &PendingMove) -> Result<MoveReport> {
        let token = &marker.token;
        let source = board.column(marker.source_column.clone());
        let target = board.column(marker.target_column.clone());
        let (source_tasks, target_tasks) = at(token, MoveStage::Copy, resolve(&source, &target))?;
        let source_doc = source_tasks.doc(marker.task_id.as_str());

        let new_id = at(
            token,
            MoveStage::Copy,
            self.copy_task(&source_doc, &target_tasks, marker).await,
        )?;

        let checklist = if self.copy_checklist {
            at(
                token,
                MoveStage::Checklist,
                self.copy_checklist_items(&source_doc, &target_tasks.doc(new_id.as_str()))
                    .await,
            )?
        } else {
            Vec::new()
        };

        at(token, MoveStage::Delete, self.delete_source(&source_doc).await)?;

        let (source_final, target_final, position_writes) = at(
            token,
            MoveStage::Renumber,
            self.renumber(&source_tasks, &target_tasks, &new_id, marker.insert_index)
                .await,
        )?;

        at(token, MoveStage::Finalize, self.finalize(board, marker).await)?;

        self.tasks.set_all(&source.cache_key(), source_final.clone());
        self.tasks.set_all(&target.cache_key(), target_final.clone());
        self.checklist
            .clear(&ContainerKey::new(marker.task_id.as_str()));
        if self.copy_checklist {
            self.checklist
                .set_all(&ContainerKey::new(new_id.as_str()), checklist.clone());
        }

        tracing::info!(
            "move {} settled: task {} is now {} in {}",
            token,
            marker.task_id,
            new_id,
            marker.target_column
        );
        Ok(MoveReport {
            token: token.clone(),
            task_id: new_id,
            source: source_final,
            target: target_final,
            checklist_copied: checklist.len(),
            position_writes,
        })
    }

    /// Id of a copy tagged with `token` in `target_tasks`, if one exists
    pub(crate) async fn find_copy(
        &self,
        target_tasks: &CollectionPath,
        token: &MoveToken,
    ) -> Result<Option<TaskId>> {
        let existing = self
            .store
            .query(
                &Query::collection(target_tasks.clone())
                    .filter(Filter::eq("moveToken", token.as_str())),
            )
            .await?;
        Ok(existing.first().map(|doc| TaskId::from(doc.id.as_str())))
    }

    async fn copy_task(
        &self,
        source_doc: &DocPath,
        target_tasks: &CollectionPath,
        marker: &PendingMove,
    ) -> Result<TaskId> {
        if let Some(id) = self.find_copy(target_tasks, &marker.token).await? {
            tracing::debug!("move {} already copied as {}", marker.token, id);
            return Ok(id);
        }

        let doc = self
            .store
            .get(source_doc)
            .await?
            .ok_or_else(|| SyncError::not_found("task", source_doc.to_string()))?;
        let mut task: Task = doc.decode()?;
        task.column_id = marker.target_column.clone();
        task.position = marker.insert_index;
        task.move_token = Some(marker.token.clone());

        let id = self
            .store
            .create(target_tasks, Document::encode(&task)?)
            .await?;
        Ok(TaskId::from(id))
    }

    async fn copy_checklist_items(
        &self,
        source_doc: &DocPath,
        target_doc: &DocPath,
    ) -> Result<Vec<ChecklistItem>> {
        let from = source_doc.child(CHECKLIST);
        let to = target_doc.child(CHECKLIST);
        let items: Vec<ChecklistItem> =
            decode_all(&self.store.query(&Query::by_position(from)).await?);
        let mut copied: Vec<ChecklistItem> =
            decode_all(&self.store.query(&Query::by_position(to.clone())).await?);

        // Copies remember their source id so a replay skips exactly what already landed.
        for item in items {
            let already = copied
                .iter()
                .any(|c| c.copied_from.as_ref() == Some(&item.id));
            if already {
                continue;
            }
            let mut copy = item;
            copy.copied_from = Some(copy.id.clone());
            let id = self.store.create(&to, Document::encode(&copy)?).await?;
            copy.set_id(&id);
            copied.push(copy);
        }

        sort_by_position(&mut copied);
        Ok(copied)
    }

    async fn delete_source(&self, source_doc: &DocPath) -> Result<()> {
        let checklist = source_doc.child(CHECKLIST);
        let items = self.store.query(&Query::collection(checklist.clone())).await?;
        let paths: Vec<DocPath> = items
            .iter()
            .map(|doc| checklist.doc(doc.id.as_str()))
            .collect();
        let results = join_all(paths.iter().map(|path| self.store.delete(path))).await;
        results.into_iter().collect::<Result<Vec<()>>>()?;

        self.store.delete(source_doc).await
    }

    async fn renumber(
        &self,
        source_tasks: &CollectionPath,
        target_tasks: &CollectionPath,
        moved_id: &TaskId,
        insert_index: usize,
    ) -> Result<(Vec<Task>, Vec<Task>, usize)> {
        let source_now: Vec<Task> =
            decode_all(&self.store.query(&Query::by_position(source_tasks.clone())).await?);
        let source_final = renumber(source_now.clone());
        let mut written = write_positions(
            self.store(),
            source_tasks,
            &changed_positions(&source_now, &source_final),
        )
        .await?;

        let target_now: Vec<Task> =
            decode_all(&self.store.query(&Query::by_position(target_tasks.clone())).await?);
        let (moved, others): (Vec<Task>, Vec<Task>) = target_now
            .iter()
            .cloned()
            .partition(|task| &task.id == moved_id);
        let target_final = match moved.into_iter().next() {
            Some(task) => insert_at(&others, task, insert_index),
            None => renumber(others),
        };
        written += write_positions(
            self.store(),
            target_tasks,
            &changed_positions(&target_now, &target_final),
        )
        .await?;

        Ok((source_final, target_final, written))
    }

    async fn finalize(&self, board: &BoardScope, marker: &PendingMove) -> Result<()> {
        let collection = board
            .pending_moves()
            .ok_or_else(|| SyncError::missing_parent(board.describe()))?;
        self.store.delete(&collection.doc(marker.id())).await
    }
}

/// Task collections of both columns
pub(crate) fn resolve<S: ContainerScope>(
    source: &S,
    target: &S,
) -> Result<(CollectionPath, CollectionPath)> {
    let source_tasks = source
        .collection()
        .ok_or_else(|| SyncError::missing_parent(source.describe()))?;
    let target_tasks = target
        .collection()
        .ok_or_else(|| SyncError::missing_parent(target.describe()))?;
    Ok((source_tasks, target_tasks))
}

//! Integration tests for activity logging

use std::sync::Arc;
use teamboard_sync::{
    compact::CompactItems,
    items::{AddItem, UpdateItem},
    remote::MemoryStore,
    reorder::ReorderItems,
    task::MoveTask,
    types::ContainerScope,
    BoardOperationProcessor, BoardScope, Column, OperationProcessor, Patch, SyncContext, Task,
    ACTIVITY_LIMIT,
};

#[tokio::test]
async fn test_activity_logging_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let ctx = SyncContext::new(store.clone());
    let processor = BoardOperationProcessor::with_actor("ann@example.com");
    let board = BoardScope::new("team", "board");

    // Two columns (logged)
    let todo = processor
        .process(&AddItem::new(board.clone(), Column::new("Todo")), &ctx)
        .await
        .unwrap();
    let done = processor
        .process(&AddItem::new(board.clone(), Column::new("Done")), &ctx)
        .await
        .unwrap();

    // A task (logged), then a title change (logged)
    let todo_tasks = board.column(todo.id.clone());
    let task = processor
        .process(&AddItem::new(todo_tasks.clone(), Task::new("Write tests")), &ctx)
        .await
        .unwrap();
    processor
        .process(
            &UpdateItem::<Task>::new(
                todo_tasks.clone(),
                task.id.as_str(),
                Patch::new().set("title", "Write more tests"),
            ),
            &ctx,
        )
        .await
        .unwrap();

    // Dropping a task on itself (unlogged)
    processor
        .process(
            &ReorderItems::<Task>::new(
                todo_tasks.clone(),
                task.id.as_str(),
                Some(task.id.to_string()),
            ),
            &ctx,
        )
        .await
        .unwrap();

    // Compacting an already dense column (unlogged)
    processor
        .process(&CompactItems::<Column>::new(board.clone()), &ctx)
        .await
        .unwrap();

    // Moving the task to Done (logged)
    let outcome = processor
        .process(
            &MoveTask::new(board.clone(), task.id.clone(), todo.id.clone(), done.id.clone()),
            &ctx,
        )
        .await
        .unwrap();
    outcome.settle().await.unwrap();

    let entries = ctx.activity();
    let ops: Vec<&str> = entries.iter().map(|e| e.op.as_str()).collect();
    assert_eq!(
        ops,
        vec!["move task", "update task", "add task", "add column", "add column"]
    );
    assert!(entries
        .iter()
        .all(|e| e.actor.as_deref() == Some("ann@example.com")));
    assert!(entries.iter().all(|e| !e.is_error()));
    assert_eq!(entries[2].output["position"], 0);

    let done_tasks = board.column(done.id.clone());
    assert_eq!(
        store.documents(&done_tasks.collection().unwrap()).len(),
        1,
        "task should live in Done"
    );
}

#[tokio::test]
async fn test_failures_are_logged_and_returned() {
    let store = Arc::new(MemoryStore::new());
    let ctx = SyncContext::new(store.clone());
    let processor = BoardOperationProcessor::new();
    store.fail_next_writes(1);

    let err = processor
        .process(
            &AddItem::new(BoardScope::new("team", "board"), Column::new("Todo")),
            &ctx,
        )
        .await
        .unwrap_err();
    assert!(err.is_remote());

    let entries = ctx.activity();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_error());
    assert_eq!(entries[0].actor, None);
}

#[tokio::test]
async fn test_activity_log_is_bounded() {
    let ctx = SyncContext::new(Arc::new(MemoryStore::new()));
    let processor = BoardOperationProcessor::new();
    let board = BoardScope::new("team", "board");

    for i in 0..ACTIVITY_LIMIT + 5 {
        processor
            .process(&AddItem::new(board.clone(), Column::new(format!("c{i}"))), &ctx)
            .await
            .unwrap();
    }
    let entries = ctx.activity();
    assert_eq!(entries.len(), ACTIVITY_LIMIT);
    assert_eq!(
        entries[0].input["item"]["name"],
        format!("c{}", ACTIVITY_LIMIT + 4)
    );
}

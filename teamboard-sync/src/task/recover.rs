//! RecoverMoves command - finish or drop interrupted moves on board load

use super::protocol::{MoveProtocol, MoveReport};
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::remote::{decode_all, Query};
use crate::types::{BoardScope, CollectionPath, ContainerScope, MoveToken, PendingMove};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use teamboard_operations::{async_trait, Execute, ExecutionResult, Operation};

/// What recovery did with each leftover marker
#[derive(Debug, Default, Serialize)]
pub struct RecoveryReport {
    /// Moves replayed to completion
    pub completed: Vec<MoveReport>,
    /// Markers dropped because the move can no longer happen (target column or task gone)
    pub abandoned: Vec<MoveToken>,
    /// Markers left in place because a step failed again
    pub failed: Vec<(MoveToken, String)>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.abandoned.is_empty() && self.failed.is_empty()
    }
}

/// Replay every pending-move marker of a board
#[derive(Debug, Clone, Serialize)]
pub struct RecoverMoves {
    pub board: BoardScope,
}

impl RecoverMoves {
    pub fn new(board: BoardScope) -> Self {
        Self { board }
    }

    async fn recover(&self, ctx: &SyncContext) -> Result<RecoveryReport> {
        let markers_path = self
            .board
            .pending_moves()
            .ok_or_else(|| SyncError::missing_parent(self.board.describe()))?;
        let columns = self
            .board
            .collection()
            .ok_or_else(|| SyncError::missing_parent(self.board.describe()))?;

        let mut markers: Vec<PendingMove> =
            decode_all(&ctx.store().query(&Query::collection(markers_path.clone())).await?);
        markers.sort_by_key(|marker| marker.created_at);

        let protocol = MoveProtocol::new(ctx);
        let mut report = RecoveryReport::default();

        for marker in markers {
            if self.is_hopeless(&protocol, &columns, &marker).await? {
                tracing::warn!("abandoning move {} of task {}", marker.token, marker.task_id);
                protocol.store().delete(&markers_path.doc(marker.id.as_str())).await?;
                report.abandoned.push(marker.token);
                continue;
            }

            tracing::info!("replaying move {} of task {}", marker.token, marker.task_id);
            match protocol.run(&self.board, &marker).await {
                Ok(done) => report.completed.push(done),
                Err(e) => {
                    tracing::error!("move {} still failing: {}", marker.token, e);
                    report.failed.push((marker.token, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Neither the target column nor any copy of the task can be found
    async fn is_hopeless(
        &self,
        protocol: &MoveProtocol,
        columns: &CollectionPath,
        marker: &PendingMove,
    ) -> Result<bool> {
        let store = protocol.store();
        if store
            .get(&columns.doc(marker.target_column.as_str()))
            .await?
            .is_none()
        {
            return Ok(true);
        }

        let source = self.board.column(marker.source_column.clone());
        let target = self.board.column(marker.target_column.clone());
        let (source_tasks, target_tasks) = super::protocol::resolve(&source, &target)?;

        if protocol.find_copy(&target_tasks, &marker.token).await?.is_some() {
            return Ok(false);
        }
        let source_exists = store
            .get(&source_tasks.doc(marker.task_id.as_str()))
            .await?
            .is_some();
        Ok(!source_exists)
    }
}

impl Operation for RecoverMoves {
    fn verb(&self) -> &'static str {
        "recover"
    }

    fn noun(&self) -> &'static str {
        "moves"
    }

    fn description(&self) -> &'static str {
        "Finish or drop cross-column moves that were interrupted"
    }
}

#[async_trait]
impl Execute<SyncContext, SyncError> for RecoverMoves {
    type Output = RecoveryReport;

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<RecoveryReport, SyncError> {
        let started = Instant::now();
        match self.recover(ctx).await {
            Ok(report) if report.is_empty() => ExecutionResult::Unlogged { value: report },
            result => ExecutionResult::record(
                self,
                json!({ "board": self.board.board }),
                started,
                result,
                |report| {
                    json!({
                        "completed": report.completed.len(),
                        "abandoned": report.abandoned.len(),
                        "failed": report.failed.len(),
                    })
                },
            ),
        }
    }
}

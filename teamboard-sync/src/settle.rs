//! Two-phase results for optimistic operations
//!
//! A drop gesture first changes the local cache synchronously, then settles against
//! the remote store in the background. [`Optimistic`] hands both phases to the caller:
//! the locally applied state right away, and a [`Settlement`] to await for the remote
//! outcome.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::task::JoinHandle;

/// Why a drop did not change anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Released outside any drop target
    NoTarget,
    /// Released on itself
    SameItem,
    /// Dragged or target item is not in the cached container
    NotInContainer,
    /// A cross-container move whose source and target are the same
    SameContainer,
    /// Dragged into another container where only reordering is allowed
    CrossContainer,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NoTarget => "no drop target",
            Self::SameItem => "dropped on itself",
            Self::NotInContainer => "item not in container",
            Self::SameContainer => "source and target container are the same",
            Self::CrossContainer => "cannot leave its container",
        };
        f.write_str(text)
    }
}

/// The remote phase of an optimistic operation, running in the background.
///
/// Dropping a settlement does not cancel it; issued writes always run to completion.
/// Failures are logged when they happen, so an unobserved settlement still leaves a
/// trace.
#[derive(Debug)]
pub struct Settlement<R> {
    label: String,
    handle: JoinHandle<Result<R>>,
}

impl<R: Send + 'static> Settlement<R> {
    /// Start the remote phase on the runtime
    pub fn spawn<F>(label: impl Into<String>, work: F) -> Self
    where
        F: Future<Output = Result<R>> + Send + 'static,
    {
        let label = label.into();
        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            let result = work.await;
            match &result {
                Ok(_) => tracing::debug!("{} settled", task_label),
                Err(e) => tracing::error!("{} failed to settle: {}", task_label, e),
            }
            result
        });
        Self { label, handle }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the remote phase
    pub async fn wait(self) -> Result<R> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(SyncError::Settlement {
                message: format!("{}: {}", self.label, e),
            }),
        }
    }
}

/// Local state applied now, remote outcome later
#[derive(Debug)]
pub struct Optimistic<L, R> {
    pub applied_locally: L,
    pub remote_settled: Settlement<R>,
}

/// Result of handling a drop
#[derive(Debug)]
pub enum DropOutcome<L, R> {
    /// Nothing changed, locally or remotely
    Ignored(IgnoreReason),
    /// The cache was updated and remote writes are in flight
    Applied(Optimistic<L, R>),
}

impl<L, R: Send + 'static> DropOutcome<L, R> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn ignored_reason(&self) -> Option<IgnoreReason> {
        match self {
            Self::Ignored(reason) => Some(*reason),
            Self::Applied(_) => None,
        }
    }

    pub fn applied_locally(&self) -> Option<&L> {
        match self {
            Self::Applied(optimistic) => Some(&optimistic.applied_locally),
            Self::Ignored(_) => None,
        }
    }

    pub fn into_optimistic(self) -> Option<Optimistic<L, R>> {
        match self {
            Self::Applied(optimistic) => Some(optimistic),
            Self::Ignored(_) => None,
        }
    }

    /// Wait for the remote phase; `None` for ignored drops
    pub async fn settle(self) -> Result<Option<R>> {
        match self {
            Self::Applied(optimistic) => optimistic.remote_settled.wait().await.map(Some),
            Self::Ignored(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settlement_yields_value() {
        let settlement = Settlement::spawn("noop", async { Ok(3usize) });
        assert_eq!(settlement.wait().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_dropped_settlement_still_runs() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let settlement = Settlement::spawn("reorder task in c1", async move {
            let _ = tx.send(());
            Ok(())
        });
        assert_eq!(settlement.label(), "reorder task in c1");
        drop(settlement);
        rx.await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_settlement_maps_to_error() {
        let explode = true;
        let settlement: Settlement<()> = Settlement::spawn("boom", async move {
            if explode {
                panic!("kaboom");
            }
            Ok(())
        });
        let err = settlement.wait().await.unwrap_err();
        assert!(matches!(err, SyncError::Settlement { .. }));
    }

    #[tokio::test]
    async fn test_ignored_outcome_settles_to_none() {
        let outcome: DropOutcome<(), ()> = DropOutcome::Ignored(IgnoreReason::SameItem);
        assert!(!outcome.is_applied());
        assert_eq!(outcome.ignored_reason(), Some(IgnoreReason::SameItem));
        assert!(outcome.settle().await.unwrap().is_none());
    }
}

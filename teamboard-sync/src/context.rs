//! SyncContext - everything an operation is allowed to touch
//!
//! The context owns the remote store handle, the configuration, one local cache per
//! entity kind and the activity log. It is passed to every operation explicitly; nothing
//! in the crate reaches for ambient state.

use crate::adapter::SyncAdapter;
use crate::cache::LocalCache;
use crate::config::SyncConfig;
use crate::remote::RemoteStore;
use crate::types::{Board, ChecklistItem, Column, Positioned, Task, Team};
use std::sync::{Arc, Mutex, PoisonError};
use teamboard_operations::LogEntry;

/// Activity entries kept in memory, oldest dropped first
pub const ACTIVITY_LIMIT: usize = 500;

/// Context passed to every operation - provides access, not logic
pub struct SyncContext {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    /// Keyed by user id
    teams: Arc<LocalCache<Team>>,
    /// Keyed by team id
    boards: Arc<LocalCache<Board>>,
    /// Keyed by board id
    columns: Arc<LocalCache<Column>>,
    /// Keyed by column id
    tasks: Arc<LocalCache<Task>>,
    /// Keyed by task id
    checklist: Arc<LocalCache<ChecklistItem>>,
    activity: Mutex<Vec<LogEntry>>,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    /// Create a context with default configuration
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_config(store, SyncConfig::default())
    }

    pub fn with_config(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            teams: Arc::default(),
            boards: Arc::default(),
            columns: Arc::default(),
            tasks: Arc::default(),
            checklist: Arc::default(),
            activity: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // =========================================================================
    // Caches
    // =========================================================================

    pub fn team_cache(&self) -> &Arc<LocalCache<Team>> {
        &self.teams
    }

    pub fn board_cache(&self) -> &Arc<LocalCache<Board>> {
        &self.boards
    }

    pub fn column_cache(&self) -> &Arc<LocalCache<Column>> {
        &self.columns
    }

    pub fn task_cache(&self) -> &Arc<LocalCache<Task>> {
        &self.tasks
    }

    pub fn checklist_cache(&self) -> &Arc<LocalCache<ChecklistItem>> {
        &self.checklist
    }

    /// Remote sync adapter for one positioned entity kind
    pub fn adapter<T: Positioned>(&self) -> SyncAdapter<T> {
        SyncAdapter::new(
            Arc::clone(&self.store),
            Arc::clone(T::cache(self)),
            self.config.compaction,
        )
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Prepend an entry to the activity log
    pub fn record_activity(&self, entry: LogEntry) {
        tracing::debug!(op = %entry.op, actor = ?entry.actor, "activity");
        let mut activity = self
            .activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        activity.insert(0, entry);
        activity.truncate(ACTIVITY_LIMIT);
    }

    /// Activity entries, newest first
    pub fn activity(&self) -> Vec<LogEntry> {
        self.activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_activity_is_newest_first_and_bounded() {
        let ctx = SyncContext::new(Arc::new(MemoryStore::new()));
        for i in 0..ACTIVITY_LIMIT + 3 {
            ctx.record_activity(LogEntry::new("add task", json!({"i": i}), json!({}), None, 0));
        }
        let activity = ctx.activity();
        assert_eq!(activity.len(), ACTIVITY_LIMIT);
        assert_eq!(activity[0].input["i"], ACTIVITY_LIMIT + 2);
    }

    #[test]
    fn test_adapter_shares_context_cache() {
        let ctx = SyncContext::new(Arc::new(MemoryStore::new()));
        let adapter = ctx.adapter::<Column>();
        assert!(Arc::ptr_eq(adapter.cache(), ctx.column_cache()));
    }
}

//! Checklist progress shown on task cards

use crate::context::SyncContext;
use crate::types::{ChecklistItem, ContainerKey, TaskId};
use serde::Serialize;

/// Done/total counts of a checklist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChecklistProgress {
    pub done: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent, 0 for an empty list
    pub percent: u8,
}

impl ChecklistProgress {
    pub fn of(items: &[ChecklistItem]) -> Self {
        let total = items.len();
        let done = items.iter().filter(|item| item.done).count();
        let percent = if total == 0 {
            0
        } else {
            u8::try_from((done * 100 + total / 2) / total).unwrap_or(100)
        };
        Self {
            done,
            total,
            percent,
        }
    }

    /// Progress of the cached checklist of `task`
    pub fn for_task(ctx: &SyncContext, task: &TaskId) -> Self {
        Self::of(&ctx.checklist_cache().get(&ContainerKey::new(task.as_str())))
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(done: &[bool]) -> Vec<ChecklistItem> {
        done.iter()
            .map(|d| {
                let mut item = ChecklistItem::new("x");
                item.done = *d;
                item
            })
            .collect()
    }

    #[test]
    fn test_empty_checklist() {
        let progress = ChecklistProgress::of(&[]);
        assert_eq!(progress, ChecklistProgress::default());
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(ChecklistProgress::of(&items(&[true, false, false])).percent, 33);
        assert_eq!(ChecklistProgress::of(&items(&[true, true, false])).percent, 67);
        assert_eq!(ChecklistProgress::of(&items(&[true, false])).percent, 50);
    }

    #[test]
    fn test_complete() {
        let progress = ChecklistProgress::of(&items(&[true, true]));
        assert_eq!(progress.percent, 100);
        assert!(progress.is_complete());
    }
}

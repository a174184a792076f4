//! Drag gesture model
//!
//! A gesture goes `Idle → Dragging → Idle`. Finishing it produces a [`DragEnd`]
//! event; cancelling produces nothing, which is the same as an invalid drop.

use super::path::ContainerKey;
use crate::settle::IgnoreReason;
use serde::{Deserialize, Serialize};

/// The thing being dragged, or an item it was dropped on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragHandle {
    /// Id of the item
    pub id: String,
    /// Container the item currently belongs to
    pub container: ContainerKey,
}

impl DragHandle {
    pub fn new(id: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            container: ContainerKey::new(container),
        }
    }
}

/// Where the dragged item was released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// On top of another item
    Item(DragHandle),
    /// On empty space of a container; appends when moving between containers
    Container { container: ContainerKey },
}

impl DropTarget {
    pub fn item(id: impl Into<String>, container: impl Into<String>) -> Self {
        Self::Item(DragHandle::new(id, container))
    }

    pub fn container(container: impl Into<String>) -> Self {
        Self::Container {
            container: ContainerKey::new(container),
        }
    }

    pub fn container_key(&self) -> &ContainerKey {
        match self {
            Self::Item(handle) => &handle.container,
            Self::Container { container } => container,
        }
    }

    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::Item(handle) => Some(&handle.id),
            Self::Container { .. } => None,
        }
    }
}

/// A finished drag gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragEnd {
    pub active: DragHandle,
    pub over: Option<DropTarget>,
}

impl DragEnd {
    pub fn new(active: DragHandle, over: Option<DropTarget>) -> Self {
        Self { active, over }
    }

    /// Reject drops that must not cause any change
    pub fn check(&self) -> Result<&DropTarget, IgnoreReason> {
        let over = self.over.as_ref().ok_or(IgnoreReason::NoTarget)?;
        if over.item_id() == Some(self.active.id.as_str()) {
            return Err(IgnoreReason::SameItem);
        }
        Ok(over)
    }

    /// Whether the item leaves its container
    pub fn is_cross_container(&self) -> bool {
        self.over
            .as_ref()
            .is_some_and(|over| over.container_key() != &self.active.container)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragHandle),
}

/// Tracks one gesture at a time
#[derive(Debug, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Pick up an item. A gesture already in progress is replaced.
    pub fn begin(&mut self, active: DragHandle) {
        self.state = DragState::Dragging(active);
    }

    /// Abort the gesture; nothing is written
    pub fn cancel(&mut self) -> Option<DragHandle> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(active) => Some(active),
            DragState::Idle => None,
        }
    }

    /// Release the item. Returns `None` when no gesture was in progress.
    pub fn finish(&mut self, over: Option<DropTarget>) -> Option<DragEnd> {
        self.cancel().map(|active| DragEnd::new(active, over))
    }
}

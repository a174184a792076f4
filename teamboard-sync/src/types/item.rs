//! Positioned entities: Column, Task, ChecklistItem

use super::ids::{ChecklistItemId, ColumnId, MoveToken, TaskId};
use super::path::{BoardScope, ColumnScope, ContainerScope, TaskScope};
use crate::cache::LocalCache;
use crate::context::SyncContext;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

/// Anything stored as a document: it has an id assigned by the store
///
/// The id is not part of the document body; it is restored from the document
/// path after decoding.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: &str);
}

/// A record that lives in an ordered container
pub trait Positioned: Record {
    /// The container kind this item belongs to
    type Scope: ContainerScope;

    /// Noun used in op strings and errors
    const NOUN: &'static str;

    fn position(&self) -> usize;
    fn set_position(&mut self, position: usize);

    /// The cache holding items of this kind
    fn cache(ctx: &SyncContext) -> &Arc<LocalCache<Self>>;
}

/// Shallow partial update: field name → new JSON value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch that only rewrites `position`
    pub fn position(position: usize) -> Self {
        Self::new().set("position", position)
    }

    /// Set a field; values that cannot be represented as JSON are skipped
    pub fn set(mut self, field: impl Into<String>, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.0.insert(field.into(), value);
            }
            Err(e) => tracing::warn!("dropping unserializable patch field: {}", e),
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Apply this patch to a record, returning the merged copy.
    ///
    /// `None` when the merged body no longer decodes (e.g. a string written into
    /// `position`).
    pub fn apply<T: Record>(&self, item: &T) -> Option<T> {
        let mut value = serde_json::to_value(item).ok()?;
        let body = value.as_object_mut()?;
        for (field, v) in &self.0 {
            if field == "id" {
                continue;
            }
            body.insert(field.clone(), v.clone());
        }
        let mut merged: T = serde_json::from_value(value).ok()?;
        merged.set_id(item.id());
        Some(merged)
    }
}

/// A workflow column on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(skip)]
    pub id: ColumnId,
    pub name: String,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub created_by: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ColumnId::default(),
            name: name.into(),
            position: 0,
            created_by: String::new(),
        }
    }

    pub fn with_created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }
}

impl Record for Column {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: &str) {
        self.id = ColumnId::from(id);
    }
}

impl Positioned for Column {
    type Scope = BoardScope;
    const NOUN: &'static str = "column";

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    fn cache(ctx: &SyncContext) -> &Arc<LocalCache<Self>> {
        ctx.column_cache()
    }
}

/// A task card. `position` is scoped to the column named by `column_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(skip)]
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub column_id: ColumnId,
    /// Assignee emails
    #[serde(default)]
    pub assigned_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub focus_count: u32,
    #[serde(default)]
    pub focus_type: String,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub is_done: bool,
    /// Set on the copy written by the last cross-column move
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_token: Option<MoveToken>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::default(),
            title: title.into(),
            description: String::new(),
            column_id: ColumnId::default(),
            assigned_to: Vec::new(),
            due_date: None,
            created_at: None,
            created_by: String::new(),
            position: 0,
            focus_count: 0,
            focus_type: "default".to_string(),
            is_start: false,
            is_done: false,
            move_token: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }

    pub fn with_assignees(mut self, emails: Vec<String>) -> Self {
        self.assigned_to = emails;
        self
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: &str) {
        self.id = TaskId::from(id);
    }
}

impl Positioned for Task {
    type Scope = ColumnScope;
    const NOUN: &'static str = "task";

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    fn cache(ctx: &SyncContext) -> &Arc<LocalCache<Self>> {
        ctx.task_cache()
    }
}

/// One line of a task's checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    #[serde(skip)]
    pub id: ChecklistItemId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub position: usize,
    /// Id of the item this one was copied from when its task changed column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copied_from: Option<ChecklistItemId>,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: ChecklistItemId::default(),
            text: text.into(),
            done: false,
            position: 0,
            copied_from: None,
        }
    }
}

impl Record for ChecklistItem {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: &str) {
        self.id = ChecklistItemId::from(id);
    }
}

impl Positioned for ChecklistItem {
    type Scope = TaskScope;
    const NOUN: &'static str = "checklist item";

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    fn cache(ctx: &SyncContext) -> &Arc<LocalCache<Self>> {
        ctx.checklist_cache()
    }
}

//! Hierarchical document paths and container scopes
//!
//! Paths follow the nesting of the data:
//!
//! ```text
//! teams/{team}/boards/{board}/columns/{column}/tasks/{task}/checkListItem/{item}
//! teams/{team}/boards/{board}/pendingMoves/{marker}
//! users/{user}
//! ```

use super::ids::{BoardId, ColumnId, TaskId, TeamId};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TEAMS: &str = "teams";
pub const BOARDS: &str = "boards";
pub const COLUMNS: &str = "columns";
pub const TASKS: &str = "tasks";
pub const CHECKLIST: &str = "checkListItem";
pub const PENDING_MOVES: &str = "pendingMoves";
pub const USERS: &str = "users";

/// Path of a collection, e.g. `teams/t1/boards/b1/columns`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// A top level collection
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Sub-collection `name` of document `id` in this collection
    pub fn child(&self, id: &str, name: &str) -> Self {
        Self(format!("{}/{}/{}", self.0, id, name))
    }

    /// Document `id` in this collection
    pub fn doc(&self, id: impl Into<String>) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sub-collection `name` of this document
    pub fn child(&self, name: &str) -> CollectionPath {
        self.collection.child(&self.id, name)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Key of one ordered sequence in a local cache (board id, column id or task id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerKey(String);

impl ContainerKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// A parent container whose children share one position numbering space
pub trait ContainerScope: Clone + fmt::Debug + Send + Sync + 'static {
    /// Remote collection holding the children, `None` if any id in the chain is missing
    fn collection(&self) -> Option<CollectionPath>;

    /// Key under which the children are cached locally
    fn cache_key(&self) -> ContainerKey;

    /// Human readable description used in errors and logs
    fn describe(&self) -> String {
        match self.collection() {
            Some(path) => path.to_string(),
            None => format!("<unresolved {}>", self.cache_key()),
        }
    }
}

/// A board: container of columns and of pending-move markers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardScope {
    pub team: TeamId,
    pub board: BoardId,
}

impl BoardScope {
    pub fn new(team: impl Into<TeamId>, board: impl Into<BoardId>) -> Self {
        Self {
            team: team.into(),
            board: board.into(),
        }
    }

    /// `teams/{team}/boards`, `None` without a team
    pub fn boards_collection(&self) -> Option<CollectionPath> {
        if self.team.is_empty() {
            return None;
        }
        Some(CollectionPath::root(TEAMS).child(self.team.as_str(), BOARDS))
    }

    /// The board document itself
    pub fn board_doc(&self) -> Option<DocPath> {
        if self.board.is_empty() {
            return None;
        }
        self.boards_collection()
            .map(|boards| boards.doc(self.board.as_str()))
    }

    /// Where pending-move markers for this board live
    pub fn pending_moves(&self) -> Option<CollectionPath> {
        self.board_doc().map(|doc| doc.child(PENDING_MOVES))
    }

    /// Scope of the tasks in `column`
    pub fn column(&self, column: impl Into<ColumnId>) -> ColumnScope {
        ColumnScope {
            board: self.clone(),
            column: column.into(),
        }
    }
}

impl ContainerScope for BoardScope {
    fn collection(&self) -> Option<CollectionPath> {
        self.board_doc().map(|doc| doc.child(COLUMNS))
    }

    fn cache_key(&self) -> ContainerKey {
        ContainerKey::new(self.board.as_str())
    }
}

/// A column: container of tasks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnScope {
    pub board: BoardScope,
    pub column: ColumnId,
}

impl ColumnScope {
    /// Scope of the checklist of `task`
    pub fn task(&self, task: impl Into<TaskId>) -> TaskScope {
        TaskScope {
            column: self.clone(),
            task: task.into(),
        }
    }
}

impl ContainerScope for ColumnScope {
    fn collection(&self) -> Option<CollectionPath> {
        if self.column.is_empty() {
            return None;
        }
        self.board
            .collection()
            .map(|columns| columns.child(self.column.as_str(), TASKS))
    }

    fn cache_key(&self) -> ContainerKey {
        ContainerKey::new(self.column.as_str())
    }
}

/// A task: container of checklist items
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskScope {
    pub column: ColumnScope,
    pub task: TaskId,
}

impl ContainerScope for TaskScope {
    fn collection(&self) -> Option<CollectionPath> {
        if self.task.is_empty() {
            return None;
        }
        self.column
            .collection()
            .map(|tasks| tasks.child(self.task.as_str(), CHECKLIST))
    }

    fn cache_key(&self) -> ContainerKey {
        ContainerKey::new(self.task.as_str())
    }
}

//! Non-positioned records: teams, boards, users and pending-move markers

use super::ids::{BoardId, ColumnId, MoveToken, TaskId, TeamId, UserId};
use super::item::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in user, as supplied by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
}

impl CurrentUser {
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty() || self.email.trim().is_empty()
    }
}

/// A team owns boards. `members` holds member emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(skip)]
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub owner_id: UserId,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Team {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: &str) {
        self.id = TeamId::from(id);
    }
}

/// A board inside a team. `members` holds member emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(skip)]
    pub id: BoardId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub created_by: UserId,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Board {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: &str) {
        self.id = BoardId::from(id);
    }
}

/// A user profile document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

impl Record for User {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn set_id(&mut self, id: &str) {
        self.id = UserId::from(id);
    }
}

/// Marker written before a cross-column move starts and removed once it has fully
/// settled. A marker found on load means the move was interrupted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMove {
    #[serde(skip)]
    pub id: String,
    pub token: MoveToken,
    pub task_id: TaskId,
    pub source_column: ColumnId,
    pub target_column: ColumnId,
    pub insert_index: usize,
    pub created_at: DateTime<Utc>,
}

impl Record for PendingMove {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

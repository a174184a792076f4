//! Boards visible to the signed-in user, and board membership commands

use crate::adapter::{merge_unique, subscribe_union, Subscription};
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::remote::{decode_all, Document, Filter, Query};
use crate::types::{
    Board, BoardScope, CollectionPath, ContainerKey, CurrentUser, Patch, Team, TeamId, User,
    TEAMS, USERS,
};
use serde_json::json;
use std::time::Instant;
use teamboard_operations::{async_trait, Execute, ExecutionResult, Operation};

fn boards_of(team: &TeamId) -> Option<CollectionPath> {
    BoardScope::new(team.clone(), "").boards_collection()
}

/// Public boards, boards listing the user's email, boards the user created
pub fn board_queries(team: &TeamId, user: &CurrentUser) -> Vec<Query> {
    let Some(boards) = boards_of(team) else {
        return Vec::new();
    };
    vec![
        Query::collection(boards.clone()).filter(Filter::eq("isPublic", true)),
        Query::collection(boards.clone())
            .filter(Filter::array_contains("members", user.email.as_str())),
        Query::collection(boards).filter(Filter::eq("createdBy", user.id.as_str())),
    ]
}

/// One-shot read of the boards of `team`, cached under the team id
pub async fn fetch_boards(
    ctx: &SyncContext,
    team: &TeamId,
    user: &CurrentUser,
) -> Result<Vec<Board>> {
    let key = ContainerKey::new(team.as_str());
    let queries = board_queries(team, user);
    if queries.is_empty() || user.is_anonymous() {
        ctx.board_cache().set_all(&key, Vec::new());
        return Ok(Vec::new());
    }

    let mut lists = Vec::with_capacity(queries.len());
    for query in &queries {
        lists.push(decode_all::<Board>(&ctx.store().query(query).await?));
    }
    let boards = merge_unique(lists);
    tracing::debug!("team {}: {} boards visible to {}", team, boards.len(), user.id);
    ctx.board_cache().set_all(&key, boards.clone());
    Ok(boards)
}

/// Keep the board list of `team` current
pub async fn subscribe_boards(
    ctx: &SyncContext,
    team: &TeamId,
    user: &CurrentUser,
) -> Result<Subscription> {
    let key = ContainerKey::new(team.as_str());
    let queries = board_queries(team, user);
    if queries.is_empty() || user.is_anonymous() {
        ctx.board_cache().set_all(&key, Vec::new());
        return Ok(Subscription::noop());
    }
    subscribe_union(
        ctx.store().as_ref(),
        ctx.board_cache().clone(),
        key,
        queries,
    )
    .await
}

async fn load_board(ctx: &SyncContext, board: &BoardScope) -> Result<Option<Board>> {
    let Some(path) = board.board_doc() else {
        return Err(SyncError::missing_parent("team or board id"));
    };
    ctx.store()
        .get(&path)
        .await?
        .map(|doc| doc.decode::<Board>())
        .transpose()
}

fn write_members(ctx: &SyncContext, board: &BoardScope, members: &[String]) {
    ctx.board_cache().patch(
        &ContainerKey::new(board.team.as_str()),
        board.board.as_str(),
        &Patch::new().set("members", members),
    );
}

/// Add a team member to a board by email
#[derive(Debug, Clone)]
pub struct AddBoardMember {
    pub board: BoardScope,
    pub email: String,
}

impl AddBoardMember {
    pub fn new(board: BoardScope, email: impl Into<String>) -> Self {
        Self {
            board,
            email: email.into(),
        }
    }

    async fn run(&self, ctx: &SyncContext) -> Result<Board> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(SyncError::validation("email is required"));
        }

        let mut board = load_board(ctx, &self.board)
            .await?
            .ok_or_else(|| SyncError::not_found("board", self.board.board.as_str()))?;

        let users = ctx
            .store()
            .query(&Query::collection(CollectionPath::root(USERS)).filter(Filter::eq("email", email)))
            .await?;
        let user = users
            .first()
            .map(Document::decode::<User>)
            .transpose()?
            .ok_or_else(|| SyncError::validation(format!("no user with email {email}")))?;

        let team_path = CollectionPath::root(TEAMS).doc(self.board.team.as_str());
        let team = ctx
            .store()
            .get(&team_path)
            .await?
            .ok_or_else(|| SyncError::not_found("team", self.board.team.as_str()))?
            .decode::<Team>()?;
        let in_team = team.members.iter().any(|m| m == email) || team.owner_id == user.id;
        if !in_team {
            return Err(SyncError::validation(format!(
                "{email} is not a member of team {}",
                team.name
            )));
        }

        if board.members.iter().any(|m| m == email) {
            return Err(SyncError::validation("user is already a member of this board"));
        }

        board.members.push(email.to_string());
        let path = self
            .board
            .board_doc()
            .ok_or_else(|| SyncError::missing_parent("team or board id"))?;
        ctx.store()
            .update(&path, Patch::new().set("members", &board.members).into_fields())
            .await?;
        write_members(ctx, &self.board, &board.members);
        tracing::info!("added {} to board {}", email, self.board.board);
        Ok(board)
    }
}

impl Operation for AddBoardMember {
    fn verb(&self) -> &'static str {
        "add"
    }

    fn noun(&self) -> &'static str {
        "board member"
    }

    fn description(&self) -> &'static str {
        "Give a team member access to a board"
    }
}

#[async_trait]
impl Execute<SyncContext, SyncError> for AddBoardMember {
    type Output = Board;

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<Board, SyncError> {
        let started = Instant::now();
        let input = json!({ "board": self.board.board, "email": self.email });
        ExecutionResult::record(self, input, started, self.run(ctx).await, |board| {
            json!({ "members": board.members })
        })
    }
}

/// Remove an email from a board's members. Returns whether the board existed.
#[derive(Debug, Clone)]
pub struct RemoveBoardMember {
    pub board: BoardScope,
    pub email: String,
}

impl RemoveBoardMember {
    pub fn new(board: BoardScope, email: impl Into<String>) -> Self {
        Self {
            board,
            email: email.into(),
        }
    }

    async fn run(&self, ctx: &SyncContext) -> Result<bool> {
        let Some(board) = load_board(ctx, &self.board).await? else {
            tracing::debug!("board {} is gone, nothing to remove", self.board.board);
            return Ok(false);
        };
        let email = self.email.trim();
        let members: Vec<String> = board
            .members
            .into_iter()
            .filter(|m| m != email)
            .collect();

        let path = self
            .board
            .board_doc()
            .ok_or_else(|| SyncError::missing_parent("team or board id"))?;
        ctx.store()
            .update(&path, Patch::new().set("members", &members).into_fields())
            .await?;
        write_members(ctx, &self.board, &members);
        Ok(true)
    }
}

impl Operation for RemoveBoardMember {
    fn verb(&self) -> &'static str {
        "remove"
    }

    fn noun(&self) -> &'static str {
        "board member"
    }

    fn description(&self) -> &'static str {
        "Revoke a user's access to a board"
    }
}

#[async_trait]
impl Execute<SyncContext, SyncError> for RemoveBoardMember {
    type Output = bool;

    async fn execute(&self, ctx: &SyncContext) -> ExecutionResult<bool, SyncError> {
        let started = Instant::now();
        match self.run(ctx).await {
            Ok(false) => ExecutionResult::Unlogged { value: false },
            result => ExecutionResult::record(
                self,
                json!({ "board": self.board.board, "email": self.email }),
                started,
                result,
                |removed| json!({ "removed": removed }),
            ),
        }
    }
}

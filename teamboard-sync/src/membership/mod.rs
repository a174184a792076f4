//! Team and board membership
//!
//! Visibility is the union of several queries (owned, shared by email, public). Each
//! is fetched or subscribed separately and merged by id before it reaches the cache.

mod boards;
mod teams;

pub use boards::{
    board_queries, fetch_boards, subscribe_boards, AddBoardMember, RemoveBoardMember,
};
pub use teams::{fetch_teams, subscribe_teams, team_queries};

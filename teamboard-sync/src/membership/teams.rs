//! Teams visible to the signed-in user

use crate::adapter::{merge_unique, subscribe_union, Subscription};
use crate::context::SyncContext;
use crate::error::Result;
use crate::remote::{decode_all, Filter, Query};
use crate::types::{CollectionPath, ContainerKey, CurrentUser, Team, TEAMS};

/// Teams the user owns, then teams listing the user's email as a member
pub fn team_queries(user: &CurrentUser) -> Vec<Query> {
    let teams = CollectionPath::root(TEAMS);
    vec![
        Query::collection(teams.clone()).filter(Filter::eq("ownerId", user.id.as_str())),
        Query::collection(teams).filter(Filter::array_contains("members", user.email.as_str())),
    ]
}

/// One-shot read, cached under the user id. Anonymous users see no teams.
pub async fn fetch_teams(ctx: &SyncContext, user: &CurrentUser) -> Result<Vec<Team>> {
    let key = ContainerKey::new(user.id.as_str());
    if user.is_anonymous() {
        ctx.team_cache().set_all(&key, Vec::new());
        return Ok(Vec::new());
    }

    let mut lists = Vec::new();
    for query in team_queries(user) {
        lists.push(decode_all::<Team>(&ctx.store().query(&query).await?));
    }
    let teams = merge_unique(lists);
    tracing::debug!("user {} sees {} teams", user.id, teams.len());
    ctx.team_cache().set_all(&key, teams.clone());
    Ok(teams)
}

/// Keep the user's team list current
pub async fn subscribe_teams(ctx: &SyncContext, user: &CurrentUser) -> Result<Subscription> {
    let key = ContainerKey::new(user.id.as_str());
    if user.is_anonymous() {
        ctx.team_cache().set_all(&key, Vec::new());
        return Ok(Subscription::noop());
    }
    subscribe_union(
        ctx.store().as_ref(),
        ctx.team_cache().clone(),
        key,
        team_queries(user),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::types::{Record, UserId};
    use std::sync::Arc;

    fn team(id: &str, owner: &str, members: &[&str]) -> Team {
        let mut team: Team = serde_json::from_value(serde_json::json!({
            "name": id,
            "ownerId": owner,
            "members": members,
        }))
        .unwrap();
        team.set_id(id);
        team
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let teams = CollectionPath::root(TEAMS);
        // Owned and also a member: must appear once.
        store.seed(&teams, &team("alpha", "u1", &["ann@x.io"])).unwrap();
        store.seed(&teams, &team("beta", "u2", &["ann@x.io"])).unwrap();
        store.seed(&teams, &team("gamma", "u2", &["bob@x.io"])).unwrap();
        store
    }

    #[tokio::test]
    async fn test_owner_and_member_teams_are_deduplicated() {
        let ctx = SyncContext::new(seeded());
        let user = CurrentUser::new("u1", "ann@x.io");

        let teams = fetch_teams(&ctx, &user).await.unwrap();
        let names: Vec<_> = teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(ctx.team_cache().get(&ContainerKey::from("u1")).len(), 2);
    }

    #[tokio::test]
    async fn test_anonymous_user_sees_nothing() {
        let ctx = SyncContext::new(seeded());
        let user = CurrentUser::new(UserId::default(), "");
        assert!(fetch_teams(&ctx, &user).await.unwrap().is_empty());
        assert!(!subscribe_teams(&ctx, &user).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_subscription_tracks_new_membership() {
        let store = seeded();
        let ctx = SyncContext::new(store.clone());
        let user = CurrentUser::new("u3", "bob@x.io");
        let key = ContainerKey::from("u3");
        let mut revisions = ctx.team_cache().watch();

        let _subscription = subscribe_teams(&ctx, &user).await.unwrap();
        while ctx.team_cache().get(&key).len() != 1 {
            revisions.changed().await.unwrap();
        }

        store
            .seed(&CollectionPath::root(TEAMS), &team("delta", "u3", &[]))
            .unwrap();
        while ctx.team_cache().get(&key).len() != 2 {
            revisions.changed().await.unwrap();
        }
    }
}

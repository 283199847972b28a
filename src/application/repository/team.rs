use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{GenericRepository, Repository};
use crate::domain::context::OpContext;
use crate::domain::entities::{Record, Resource, ResourceId, Team, User};
use crate::domain::errors::RepositoryResult;
use crate::domain::ports::{Cascade, DocumentStore, Filter};

#[derive(Clone)]
pub struct TeamRepository {
    teams: GenericRepository<Team>,
    users: GenericRepository<User>,
}

impl TeamRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            teams: GenericRepository::new(store.clone()),
            users: GenericRepository::new(store),
        }
    }

    fn affiliation(team_id: ResourceId) -> Filter {
        Filter::eq("team", team_id.to_string())
    }

    /// Users whose affiliation points at `team_id`.
    pub async fn members(
        &self,
        ctx: &OpContext,
        team_id: ResourceId,
    ) -> RepositoryResult<Vec<Record<User>>> {
        self.users.find_where(ctx, Self::affiliation(team_id)).await
    }
}

#[async_trait]
impl Repository<Team> for TeamRepository {
    fn base(&self) -> &GenericRepository<Team> {
        &self.teams
    }

    /// Resets every affiliated user to unaffiliated and removes the team, atomically
    /// where the store supports it. A failure leaves the team document in place, so
    /// the delete can be retried until no member points at it.
    async fn delete(&self, ctx: &OpContext, id: ResourceId) -> RepositoryResult<()> {
        let released = self
            .teams
            .store()
            .delete_cascading(
                ctx,
                Team::COLLECTION,
                id,
                Cascade {
                    collection: User::COLLECTION.to_string(),
                    filter: Self::affiliation(id),
                    patch: json!({ "team": null }),
                },
            )
            .await?;

        tracing::info!("Team {} deleted, {} member(s) released", id, released);
        Ok(())
    }
}

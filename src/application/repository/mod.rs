mod generic;
mod team;
mod user;

pub use generic::GenericRepository;
pub use team::TeamRepository;
pub use user::UserRepository;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::context::OpContext;
use crate::domain::entities::{Case, Criterion, Event, Record, Resource, ResourceId};
use crate::domain::errors::RepositoryResult;
use crate::domain::page::{Page, PageRequest};

pub type CaseRepository = GenericRepository<Case>;
pub type CriterionRepository = GenericRepository<Criterion>;
pub type EventRepository = GenericRepository<Event>;

/// Repository contract for one resource kind.
///
/// Every operation defaults to the generic implementation; resource repositories
/// override the ones with side effects (team deletion, for one).
#[async_trait]
pub trait Repository<T: Resource>: Send + Sync {
    fn base(&self) -> &GenericRepository<T>;

    async fn create(&self, ctx: &OpContext, item: &T) -> RepositoryResult<ResourceId> {
        self.base().create(ctx, item).await
    }

    async fn get_by_id(&self, ctx: &OpContext, id: ResourceId) -> RepositoryResult<Record<T>> {
        self.base().get_by_id(ctx, id).await
    }

    async fn get_by(&self, ctx: &OpContext, field: &str, value: Value) -> RepositoryResult<Record<T>> {
        self.base().get_by(ctx, field, value).await
    }

    async fn find(&self, ctx: &OpContext) -> RepositoryResult<Vec<Record<T>>> {
        self.base().find(ctx).await
    }

    async fn find_paged(
        &self,
        ctx: &OpContext,
        page: PageRequest,
    ) -> RepositoryResult<Page<Record<T>>> {
        self.base().find_paged(ctx, page).await
    }

    async fn update(&self, ctx: &OpContext, id: ResourceId, patch: &T::Patch) -> RepositoryResult<()> {
        self.base().update(ctx, id, patch).await
    }

    async fn delete(&self, ctx: &OpContext, id: ResourceId) -> RepositoryResult<()> {
        self.base().delete(ctx, id).await
    }
}

#[async_trait]
impl<T: Resource> Repository<T> for GenericRepository<T> {
    fn base(&self) -> &GenericRepository<T> {
        self
    }
}

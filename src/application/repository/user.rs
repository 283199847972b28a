use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{GenericRepository, Repository};
use crate::domain::context::OpContext;
use crate::domain::entities::{Record, User};
use crate::domain::errors::RepositoryResult;
use crate::domain::ports::DocumentStore;

#[derive(Clone)]
pub struct UserRepository {
    users: GenericRepository<User>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: GenericRepository::new(store),
        }
    }

    /// Usernames are unique by construction (registration refuses duplicates), so
    /// the first-inserted match is the only one.
    pub async fn get_by_username(
        &self,
        ctx: &OpContext,
        username: &str,
    ) -> RepositoryResult<Record<User>> {
        self.users
            .get_by(ctx, "username", Value::String(username.to_string()))
            .await
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    fn base(&self) -> &GenericRepository<User> {
        &self.users
    }
}

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiResult;
use crate::application::bot::RegistrationBot;
use crate::application::repository::{
    CaseRepository, CriterionRepository, EventRepository, TeamRepository, UserRepository,
};
use crate::domain::context::OpContext;
use crate::domain::entities::{Identity, ResourceId, Role};

#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub teams: TeamRepository,
    pub cases: CaseRepository,
    pub criteria: CriterionRepository,
    pub events: EventRepository,
    pub authenticator: Arc<dyn Authenticator>,
    pub bot: Arc<RegistrationBot>,
    pub webhook_secret: Option<String>,
    pub request_timeout: Duration,
}

/// Resolves the caller of a request.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, ctx: &OpContext, headers: &HeaderMap) -> ApiResult<Identity>;
}

/// Every request is the same admin. Only for local testing of the API.
pub struct StaticAuthenticator {
    identity: Identity,
}

impl StaticAuthenticator {
    pub fn admin() -> Self {
        Self {
            identity: Identity {
                id: ResourceId::nil(),
                username: "api-test".to_string(),
                role: Role::Admin,
                team: None,
            },
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, _ctx: &OpContext, _headers: &HeaderMap) -> ApiResult<Identity> {
        Ok(self.identity.clone())
    }
}

/// Resolve the caller and store it in request extensions for the handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let ctx = OpContext::with_timeout(state.request_timeout);
    let identity = state
        .authenticator
        .authenticate(&ctx, request.headers())
        .await?;

    tracing::debug!("Authenticated {} ({})", identity.username, identity.role);
    request
        .extensions_mut()
        .insert(AuthenticatedUser { identity });

    Ok(next.run(request).await)
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: Identity,
}

impl Deref for AuthenticatedUser {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.identity
    }
}

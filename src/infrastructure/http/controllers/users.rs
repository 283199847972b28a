use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde_json::{json, Value};

use super::resource::{check_fields, paged, parse_id, PageParams, DELETED, UPDATED};
use crate::application::repository::Repository;
use crate::application::validation::{AccessContext, Target};
use crate::domain::context::OpContext;
use crate::domain::entities::{Record, Resource, ResourceId, User, UserPatch};
use crate::domain::errors::RepositoryError;
use crate::domain::ports::DocumentStore;
use crate::infrastructure::http::middleware::permission::require_admin_or_self;
use crate::infrastructure::http::middleware::{
    ApiError, ApiResult, AppState, AuthenticatedUser, RequestContext,
};

pub async fn list_users(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    query: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let page = PageParams::from_query(query)?;
    let users = state.users.find_paged(&ctx, page).await?;
    paged("users", users)
}

pub async fn get_user(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Record<User>>> {
    let id = parse_id(&id)?;
    Ok(Json(state.users.get_by_id(&ctx, id).await?))
}

pub async fn get_user_by_name(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(username): Path<String>,
) -> ApiResult<Json<Record<User>>> {
    Ok(Json(state.users.get_by_username(&ctx, &username).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<&'static str> {
    let id = parse_id(&id)?;
    let Json(patch) = payload?;

    check_fields("user", &patch, &AccessContext::new(&caller, Target::User(id)))?;

    if let Some(team_id) = patch.team {
        require_team(&state, &ctx, team_id).await?;
    }

    state.users.update(&ctx, id, &patch).await?;

    // A team deleted between the check and the write has already run its cascade,
    // so the affiliation just written would dangle.
    if let Some(team_id) = patch.team {
        match require_team(&state, &ctx, team_id).await {
            Ok(()) => {}
            Err(err @ ApiError::BadRequest(_)) => {
                state
                    .users
                    .base()
                    .store()
                    .update(&ctx, User::COLLECTION, id, json!({ "team": null }))
                    .await?;
                tracing::warn!("Team {} vanished while user {} joined it", team_id, id);
                return Err(err);
            }
            Err(err) => return Err(err),
        }
    }

    tracing::info!("User {} updated by {}", id, caller.username);
    Ok(UPDATED)
}

async fn require_team(state: &AppState, ctx: &OpContext, team_id: ResourceId) -> ApiResult<()> {
    match state.teams.get_by_id(ctx, team_id).await {
        Ok(_) => Ok(()),
        Err(RepositoryError::NotFound(_)) => {
            Err(ApiError::BadRequest(format!("Team {} does not exist", team_id)))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_user(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<&'static str> {
    let id = parse_id(&id)?;
    require_admin_or_self(&caller, id)?;

    state.users.delete(&ctx, id).await?;
    tracing::info!("User {} deleted by {}", id, caller.username);
    Ok(DELETED)
}

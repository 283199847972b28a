use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::resource::{check_fields, created, paged, parse_id, PageParams, DELETED, UPDATED};
use crate::application::repository::Repository;
use crate::application::validation::{AccessContext, Target};
use crate::domain::entities::{CreateTeamRequest, Record, Team, TeamPatch, User};
use crate::domain::errors::RepositoryError;
use crate::infrastructure::http::middleware::permission::{
    require_team_editor, require_team_owner, require_unaffiliated,
};
use crate::infrastructure::http::middleware::{
    ApiError, ApiResult, AppState, AuthenticatedUser, RequestContext,
};

pub async fn list_teams(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    query: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let page = PageParams::from_query(query)?;
    let teams = state.teams.find_paged(&ctx, page).await?;
    paged("teams", teams)
}

pub async fn get_team(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Record<Team>>> {
    let id = parse_id(&id)?;
    Ok(Json(state.teams.get_by_id(&ctx, id).await?))
}

pub async fn get_team_members(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Record<User>>>> {
    let id = parse_id(&id)?;
    Ok(Json(state.teams.members(&ctx, id).await?))
}

pub async fn create_team(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, String)> {
    require_unaffiliated(&caller)?;
    let Json(request) = payload?;
    check_fields("team", &request, &AccessContext::new(&caller, Target::Unscoped))?;

    let id = state
        .teams
        .create(&ctx, &Team::new(request.name, caller.id))
        .await?;
    tracing::info!("Team {} created by {}", id, caller.username);
    Ok(created(id))
}

pub async fn update_team(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<TeamPatch>, JsonRejection>,
) -> ApiResult<&'static str> {
    let id = parse_id(&id)?;
    let team = state.teams.get_by_id(&ctx, id).await?;
    require_team_editor(&caller, &team)?;

    let Json(patch) = payload?;
    check_fields("team", &patch, &AccessContext::new(&caller, Target::Team(&team)))?;

    if let Some(leader) = patch.leader {
        match state.users.get_by_id(&ctx, leader).await {
            Ok(_) => {}
            Err(RepositoryError::NotFound(_)) => {
                return Err(ApiError::BadRequest(format!("User {} does not exist", leader)))
            }
            Err(e) => return Err(e.into()),
        }
    }

    state.teams.update(&ctx, id, &patch).await?;
    tracing::info!("Team {} updated by {}", id, caller.username);
    Ok(UPDATED)
}

pub async fn delete_team(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<&'static str> {
    let id = parse_id(&id)?;
    let team = state.teams.get_by_id(&ctx, id).await?;
    require_team_owner(&caller, &team)?;

    state.teams.delete(&ctx, id).await?;
    Ok(DELETED)
}

//! Cases, criteria and events: admin-managed and listed in full.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::resource::{check_fields, created, parse_id, DELETED, UPDATED};
use crate::application::repository::{GenericRepository, Repository};
use crate::application::validation::{AccessContext, FieldAccess, Target};
use crate::domain::entities::{Case, Criterion, Event, Record, Resource};
use crate::infrastructure::http::middleware::permission::require_admin;
use crate::infrastructure::http::middleware::{
    ApiResult, AppState, AuthenticatedUser, RequestContext,
};

pub trait ReferenceResource: Resource + FieldAccess {
    /// Singular name used in logs and metrics.
    const KIND: &'static str;

    fn repository(state: &AppState) -> &GenericRepository<Self>;
}

impl ReferenceResource for Case {
    const KIND: &'static str = "case";

    fn repository(state: &AppState) -> &GenericRepository<Self> {
        &state.cases
    }
}

impl ReferenceResource for Criterion {
    const KIND: &'static str = "criterion";

    fn repository(state: &AppState) -> &GenericRepository<Self> {
        &state.criteria
    }
}

impl ReferenceResource for Event {
    const KIND: &'static str = "event";

    fn repository(state: &AppState) -> &GenericRepository<Self> {
        &state.events
    }
}

pub async fn list<T: ReferenceResource>(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
) -> ApiResult<Json<Vec<Record<T>>>> {
    Ok(Json(T::repository(&state).find(&ctx).await?))
}

pub async fn get<T: ReferenceResource>(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Record<T>>> {
    let id = parse_id(&id)?;
    Ok(Json(T::repository(&state).get_by_id(&ctx, id).await?))
}

pub async fn create<T: ReferenceResource>(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult<(StatusCode, String)> {
    require_admin(&caller, &format!("create a {}", T::KIND))?;
    let Json(item) = payload?;
    check_fields(T::KIND, &item, &AccessContext::new(&caller, Target::Unscoped))?;

    let id = T::repository(&state).create(&ctx, &item).await?;
    tracing::info!("Created {} {}", T::KIND, id);
    Ok(created(id))
}

pub async fn update<T>(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<T::Patch>, JsonRejection>,
) -> ApiResult<&'static str>
where
    T: ReferenceResource,
    T::Patch: FieldAccess,
{
    let id = parse_id(&id)?;
    require_admin(&caller, &format!("update a {}", T::KIND))?;
    let Json(patch) = payload?;
    check_fields(T::KIND, &patch, &AccessContext::new(&caller, Target::Unscoped))?;

    T::repository(&state).update(&ctx, id, &patch).await?;
    tracing::info!("Updated {} {}", T::KIND, id);
    Ok(UPDATED)
}

pub async fn delete<T: ReferenceResource>(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    axum::Extension(caller): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<&'static str> {
    let id = parse_id(&id)?;
    require_admin(&caller, &format!("delete a {}", T::KIND))?;

    T::repository(&state).delete(&ctx, id).await?;
    tracing::info!("Deleted {} {}", T::KIND, id);
    Ok(DELETED)
}

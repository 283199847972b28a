//! Pieces every resource endpoint shares.

use axum::{extract::Query, extract::rejection::QueryRejection, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::application::validation::{validate, AccessContext, FieldAccess};
use crate::domain::entities::ResourceId;
use crate::domain::page::{Page, PageRequest};
use crate::infrastructure::http::middleware::{ApiError, ApiResult};

pub const UPDATED: &str = "Successfully updated";
pub const DELETED: &str = "Successfully deleted";

/// Raw `page` and `limit` query parameters. Both are required.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    page: Option<String>,
    limit: Option<String>,
}

impl PageParams {
    pub fn from_query(query: Result<Query<PageParams>, QueryRejection>) -> ApiResult<PageRequest> {
        let Query(params) = query?;
        params.into_request()
    }

    pub fn into_request(self) -> ApiResult<PageRequest> {
        let page = parse_positive("page", self.page)?;
        let limit = parse_positive("limit", self.limit)?;
        Ok(PageRequest::new(page, limit)?)
    }
}

fn parse_positive(name: &str, value: Option<String>) -> ApiResult<u64> {
    let value = value.ok_or_else(|| ApiError::BadRequest(format!("No {} number provided", name)))?;
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} number", name)))
}

pub fn parse_id(raw: &str) -> ApiResult<ResourceId> {
    Ok(raw.parse()?)
}

/// Run the field rules for `request`, counting rejections per resource kind.
pub fn check_fields<R>(resource: &'static str, request: &R, ctx: &AccessContext<'_>) -> ApiResult<()>
where
    R: FieldAccess + ?Sized,
{
    validate(request, ctx).map_err(|errors| {
        metrics::counter!("hackhub_validation_rejections_total", "resource" => resource).increment(1);
        tracing::warn!("Rejected {} request from {}: {}", resource, ctx.identity.username, errors);
        ApiError::from(errors)
    })
}

/// `{ "<key>": [...], "count": total }`
pub fn paged<T: Serialize>(key: &str, page: Page<T>) -> ApiResult<Json<Value>> {
    let items = serde_json::to_value(page.items)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize JSON: {}", e)))?;
    Ok(Json(json!({ key: items, "count": page.total })))
}

pub fn created(id: ResourceId) -> (StatusCode, String) {
    (StatusCode::CREATED, id.to_string())
}

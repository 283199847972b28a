use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use super::auth::AppState;
use crate::domain::context::OpContext;

/// Store calls made while handling a request share one deadline.
pub struct RequestContext(pub OpContext);

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(RequestContext(OpContext::with_timeout(state.request_timeout)))
    }
}

use axum::Json;

use crate::domain::entities::Identity;
use crate::infrastructure::http::middleware::AuthenticatedUser;

/// The caller as the service resolved them.
pub async fn get_me(axum::Extension(caller): axum::Extension<AuthenticatedUser>) -> Json<Identity> {
    Json(caller.identity)
}

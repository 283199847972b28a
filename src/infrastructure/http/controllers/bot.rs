use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::application::bot::{send_message_body, BotUpdate, TelegramUpdate};
use crate::infrastructure::http::middleware::{ApiError, ApiResult, AppState, RequestContext};

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Telegram webhook. Replies are returned inline as a `sendMessage` call. Updates the
/// bot cannot use are acknowledged with an empty 200 so Telegram does not redeliver them.
pub async fn webhook(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
    headers: HeaderMap,
    payload: Result<Json<TelegramUpdate>, JsonRejection>,
) -> ApiResult<Response> {
    let expected = state
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("Webhook is not configured".to_string()))?;
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        tracing::warn!("Rejected webhook call with a bad secret token");
        return Err(ApiError::Unauthorized("Invalid webhook secret".to_string()));
    }

    let Json(update) = payload?;
    let update_id = update.update_id;
    let update = match BotUpdate::try_from(update) {
        Ok(update) => update,
        Err(e) => {
            tracing::debug!("Skipping update {}: {}", update_id, e);
            return Ok(StatusCode::OK.into_response());
        }
    };

    match state.bot.handle(&ctx, &update).await {
        Some(reply) => Ok(Json(send_message_body(&reply)).into_response()),
        None => Ok(StatusCode::OK.into_response()),
    }
}

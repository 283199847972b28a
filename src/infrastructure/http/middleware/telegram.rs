//! Telegram Mini App init-data verification.
//!
//! The mini app forwards `Telegram.WebApp.initData` verbatim in the `TG-Init-Data`
//! header. Its `hash` is an HMAC-SHA256 over the remaining pairs, keyed with
//! `HMAC-SHA256("WebAppData", bot_token)`.

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use super::auth::Authenticator;
use super::error::{ApiError, ApiResult};
use crate::application::repository::UserRepository;
use crate::domain::context::OpContext;
use crate::domain::entities::Identity;
use crate::domain::errors::RepositoryError;

pub const INIT_DATA_HEADER: &str = "TG-Init-Data";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data is missing the hash")]
    MissingHash,
    #[error("init data signature is malformed")]
    MalformedHash,
    #[error("init data signature does not match")]
    SignatureMismatch,
    #[error("init data is missing a valid auth_date")]
    MissingAuthDate,
    #[error("init data has expired")]
    Expired,
    #[error("init data carries no user")]
    MissingUser,
    #[error("init data user has no username")]
    MissingUsername,
}

/// Fields of verified init data the service uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    pub auth_date: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
}

#[derive(Deserialize)]
struct WebAppUser {
    id: i64,
    username: Option<String>,
}

/// MAC keyed for checking init data issued to `bot_token`'s bot.
fn signature_mac(bot_token: &str) -> Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut secret = HmacSha256::new_from_slice(b"WebAppData")?;
    secret.update(bot_token.as_bytes());
    HmacSha256::new_from_slice(&secret.finalize().into_bytes())
}

fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut lines: Vec<String> = pairs
        .iter()
        .filter(|(key, _)| key != "hash")
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    lines.sort();
    lines.join("\n")
}

/// Check the signature and age of `raw` init data.
pub fn verify_init_data(
    raw: &str,
    bot_token: &str,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<InitData, InitDataError> {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let hash = pairs
        .iter()
        .find(|(key, _)| key == "hash")
        .map(|(_, value)| value.as_str())
        .ok_or(InitDataError::MissingHash)?;
    let signature = hex::decode(hash).map_err(|_| InitDataError::MalformedHash)?;

    let mut mac = signature_mac(bot_token).map_err(|_| InitDataError::SignatureMismatch)?;
    mac.update(data_check_string(&pairs).as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| InitDataError::SignatureMismatch)?;

    let field = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let auth_date = field("auth_date")
        .and_then(|value| value.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or(InitDataError::MissingAuthDate)?;
    if now - auth_date > max_age {
        return Err(InitDataError::Expired);
    }

    let user: WebAppUser = field("user")
        .and_then(|value| serde_json::from_str(value).ok())
        .ok_or(InitDataError::MissingUser)?;
    let username = user.username.ok_or(InitDataError::MissingUsername)?;

    Ok(InitData {
        auth_date,
        user_id: user.id,
        username,
    })
}

/// Resolves the caller from signed init data and the users collection.
pub struct TelegramInitDataAuthenticator {
    bot_token: String,
    max_age: Duration,
    users: UserRepository,
}

impl TelegramInitDataAuthenticator {
    pub fn new(bot_token: String, max_age: Duration, users: UserRepository) -> Self {
        Self {
            bot_token,
            max_age,
            users,
        }
    }
}

#[async_trait]
impl Authenticator for TelegramInitDataAuthenticator {
    async fn authenticate(&self, ctx: &OpContext, headers: &HeaderMap) -> ApiResult<Identity> {
        let raw = headers
            .get(INIT_DATA_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", INIT_DATA_HEADER)))?;

        let init_data = verify_init_data(raw, &self.bot_token, self.max_age, Utc::now())
            .map_err(|e| {
                tracing::warn!("Rejected init data: {}", e);
                ApiError::BadRequest(e.to_string())
            })?;

        match self.users.get_by_username(ctx, &init_data.username).await {
            Ok(user) => Ok(Identity::from(&user)),
            Err(RepositoryError::NotFound(_)) => Err(ApiError::Unauthorized(format!(
                "User {} is not registered",
                init_data.username
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

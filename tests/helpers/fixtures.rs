use axum::body::Body;
use axum::Router;
use chrono::{NaiveDate, Utc};
use hackhub::bootstrap::build_app_state;
use hackhub::config::Config;
use hackhub::domain::context::OpContext;
use hackhub::domain::entities::{Record, ResourceId, Role, Team, User};
use hackhub::domain::ports::DocumentStore;
use hackhub::infrastructure::http::middleware::{AppState, INIT_DATA_HEADER};
use hackhub::infrastructure::http::router::build_router;
use hackhub::{ConversationStore, Repository, TeamRepository, UserRepository};
use hmac::{Hmac, Mac};
use http::{Request, Response};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const BOT_TOKEN: &str = "123456:test-token";
pub const WEBHOOK_SECRET: &str = "webhook-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "memory://".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        telegram_token: Some(BOT_TOKEN.to_string()),
        api_test: false,
        init_data_max_age: chrono::Duration::hours(24),
        request_timeout: Duration::from_secs(5),
        dialogue_ttl: Duration::from_secs(30 * 60),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        mini_app_url: Some("https://example.org/app".to_string()),
        admin_username: None,
        otel_exporter_endpoint: None,
        service_name: "hackhub-test".to_string(),
        metrics_port: 0,
    }
}

pub fn test_state(store: Arc<dyn DocumentStore>) -> AppState {
    build_app_state(store, Arc::new(ConversationStore::new()), &test_config())
        .expect("Failed to build app state")
}

pub fn test_app(store: Arc<dyn DocumentStore>) -> Router {
    build_router(test_state(store))
}

pub fn user(username: &str, role: Role, team: Option<ResourceId>) -> User {
    User {
        team,
        role,
        ..User::participant(
            "Иванов Иван".to_string(),
            NaiveDate::from_ymd_opt(2001, 5, 17).expect("valid date"),
            username.to_string(),
            42,
        )
    }
}

pub async fn seed_user(
    store: &Arc<dyn DocumentStore>,
    username: &str,
    role: Role,
    team: Option<ResourceId>,
) -> Record<User> {
    let ctx = OpContext::background();
    let users = UserRepository::new(store.clone());
    let id = users
        .create(&ctx, &user(username, role, team))
        .await
        .expect("Failed to seed user");
    users.get_by_id(&ctx, id).await.expect("Seeded user missing")
}

pub async fn seed_team(store: &Arc<dyn DocumentStore>, name: &str, leader: ResourceId) -> Record<Team> {
    let ctx = OpContext::background();
    let teams = TeamRepository::new(store.clone());
    let id = teams
        .create(&ctx, &Team::new(name.to_string(), leader))
        .await
        .expect("Failed to seed team");
    teams.get_by_id(&ctx, id).await.expect("Seeded team missing")
}

/// Mini-app init data for `username`, signed with [`BOT_TOKEN`].
pub fn signed_init_data(username: &str) -> String {
    let auth_date = Utc::now().timestamp().to_string();
    let user = format!(r#"{{"id":42,"first_name":"Test","username":"{}"}}"#, username);
    let pairs = [("auth_date", auth_date.as_str()), ("user", user.as_str())];

    let mut secret = Hmac::<Sha256>::new_from_slice(b"WebAppData").expect("HMAC key");
    secret.update(BOT_TOKEN.as_bytes());
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&secret.finalize().into_bytes()).expect("HMAC key");
    let mut lines: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    lines.sort();
    mac.update(lines.join("\n").as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

/// Build a request, authenticated as `username` when given.
pub fn request(method: &str, uri: &str, as_user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(username) = as_user {
        builder = builder.header(INIT_DATA_HEADER, signed_init_data(username));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request"),
        None => builder.body(Body::empty()).expect("Failed to build request"),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("Router failed")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("Body is not JSON")
}

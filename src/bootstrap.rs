use std::sync::Arc;

use crate::application::bot::{ConversationStore, RegistrationBot};
use crate::application::repository::{
    CaseRepository, CriterionRepository, EventRepository, Repository, TeamRepository,
    UserRepository,
};
use crate::config::{Config, ConfigError};
use crate::domain::context::OpContext;
use crate::domain::entities::{Role, UserPatch};
use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::ports::DocumentStore;
use crate::infrastructure::http::middleware::{
    AppState, Authenticator, StaticAuthenticator, TelegramInitDataAuthenticator,
};
use crate::infrastructure::persistence::{Database, InMemoryDocumentStore};

/// Open the store named by `DATABASE_URL`, applying migrations for SQL backends.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if config.uses_memory_store() {
        tracing::warn!("Using the in-memory document store; data is lost on restart");
        return Ok(Arc::new(InMemoryDocumentStore::new()));
    }

    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;
    tracing::info!("Database migrations applied");
    Ok(Arc::new(db))
}

pub fn build_app_state(
    store: Arc<dyn DocumentStore>,
    dialogues: Arc<ConversationStore>,
    config: &Config,
) -> Result<AppState, ConfigError> {
    let users = UserRepository::new(store.clone());

    let authenticator: Arc<dyn Authenticator> = if config.api_test {
        tracing::warn!("API_TEST is set: every request is authenticated as an admin");
        Arc::new(StaticAuthenticator::admin())
    } else {
        let token = config
            .telegram_token
            .clone()
            .ok_or(ConfigError::MissingTelegramToken)?;
        Arc::new(TelegramInitDataAuthenticator::new(
            token,
            config.init_data_max_age,
            users.clone(),
        ))
    };

    let bot = RegistrationBot::new(users.clone(), dialogues, config.mini_app_url.clone());

    Ok(AppState {
        users,
        teams: TeamRepository::new(store.clone()),
        cases: CaseRepository::new(store.clone()),
        criteria: CriterionRepository::new(store.clone()),
        events: EventRepository::new(store),
        authenticator,
        bot: Arc::new(bot),
        webhook_secret: config.webhook_secret.clone(),
        request_timeout: config.request_timeout,
    })
}

/// Give `username` the admin role. Returns `false` when no such user is registered yet.
pub async fn promote_admin(users: &UserRepository, username: &str) -> RepositoryResult<bool> {
    let ctx = OpContext::background();
    let user = match users.get_by_username(&ctx, username).await {
        Ok(user) => user,
        Err(RepositoryError::NotFound(_)) => {
            tracing::warn!("Admin user {} is not registered yet", username);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if user.role != Role::Admin {
        let patch = UserPatch {
            role: Some(Role::Admin),
            ..Default::default()
        };
        users.update(&ctx, user.id, &patch).await?;
        tracing::info!("Promoted {} to admin", username);
    }
    Ok(true)
}

use hackhub::bootstrap;
use hackhub::config::Config;
use hackhub::infrastructure::http::router::build_router;
use hackhub::infrastructure::observability;
use hackhub::ConversationStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _observability = observability::init(&config)?;
    tracing::info!("Configuration loaded");

    let store = bootstrap::open_store(&config).await?;

    let dialogues = Arc::new(ConversationStore::new());
    let state = bootstrap::build_app_state(store, dialogues.clone(), &config)?;

    if let Some(username) = &config.admin_username {
        bootstrap::promote_admin(&state.users, username).await?;
    }

    let shutdown = CancellationToken::new();
    let reaper = dialogues.spawn_reaper(config.dialogue_ttl, shutdown.clone());

    let app = build_router(state);

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    reaper.await?;
    Ok(())
}

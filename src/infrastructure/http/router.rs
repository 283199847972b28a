use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::domain::entities::{Case, Criterion, Event};
use crate::infrastructure::http::controllers::{bot, me, reference, teams, users};
use crate::infrastructure::http::middleware::{require_auth, AppState};

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Reads are public; writes and `/me` go through `require_auth`.
pub fn build_router(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), require_auth);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/me", get(me::get_me).route_layer(auth.clone()))
        // Users
        .route("/users/", get(users::list_users))
        .route("/users/by-name/:username", get(users::get_user_by_name))
        .route(
            "/users/:id",
            get(users::get_user).merge(
                patch(users::update_user)
                    .delete(users::delete_user)
                    .route_layer(auth.clone()),
            ),
        )
        // Teams
        .route(
            "/teams/",
            get(teams::list_teams).merge(post(teams::create_team).route_layer(auth.clone())),
        )
        .route("/teams/:id/members", get(teams::get_team_members))
        .route(
            "/teams/:id",
            get(teams::get_team).merge(
                patch(teams::update_team)
                    .delete(teams::delete_team)
                    .route_layer(auth.clone()),
            ),
        )
        // Cases
        .route(
            "/cases/",
            get(reference::list::<Case>)
                .merge(post(reference::create::<Case>).route_layer(auth.clone())),
        )
        .route(
            "/cases/:id",
            get(reference::get::<Case>).merge(
                patch(reference::update::<Case>)
                    .delete(reference::delete::<Case>)
                    .route_layer(auth.clone()),
            ),
        )
        // Criteria
        .route(
            "/criteria/",
            get(reference::list::<Criterion>)
                .merge(post(reference::create::<Criterion>).route_layer(auth.clone())),
        )
        .route(
            "/criteria/:id",
            get(reference::get::<Criterion>).merge(
                patch(reference::update::<Criterion>)
                    .delete(reference::delete::<Criterion>)
                    .route_layer(auth.clone()),
            ),
        )
        // Events
        .route(
            "/events/",
            get(reference::list::<Event>)
                .merge(post(reference::create::<Event>).route_layer(auth.clone())),
        )
        .route(
            "/events/:id",
            get(reference::get::<Event>).merge(
                patch(reference::update::<Event>)
                    .delete(reference::delete::<Event>)
                    .route_layer(auth),
            ),
        );

    if state.webhook_secret.is_some() {
        router = router.route("/bot/webhook", post(bot::webhook));
    }

    router
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

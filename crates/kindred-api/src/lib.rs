//! HTTP API for accounts, profiles and direct messaging.

pub mod auth;
pub mod conversations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notify;
pub mod profile;
pub mod reactions;
pub mod service;
pub mod tokens;
pub mod zodiac;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::auth::AppState;

/// Every `/api` route. Callers add CORS and tracing layers.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/api/me", get(auth::me))
        .route("/api/createProfile", post(profile::create_profile))
        .route("/api/getProfile", get(profile::get_profile))
        .route("/api/updateProfile", put(profile::update_profile))
        .route("/api/profiles/{profile_id}", get(profile::get_profile_by_id))
        .route("/api/sendMessage", post(messages::send_message))
        .route("/api/viewMessages/{conversation_id}", get(messages::view_messages))
        .route("/api/conversations", get(conversations::list_conversations))
        .route(
            "/api/messages/{message_id}",
            put(messages::edit_message).delete(messages::delete_message),
        )
        .route(
            "/api/messages/{message_id}/reaction",
            post(reactions::add_reaction).delete(reactions::remove_reaction),
        )
        .route(
            "/api/block-user/{user_id}",
            post(conversations::block_user).delete(conversations::unblock_user),
        )
        .route("/api/unblock-user/{user_id}", post(conversations::unblock_user))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

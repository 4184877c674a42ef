pub mod auth;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod users;

pub use state::AppState;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState) -> Router {
    // Routes any authenticated caller may hit. The two message-specific
    // rules (sender-or-recipient, recipient-only) are enforced inside
    // the handlers themselves.
    let authenticated = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/messages", post(messages::create_message))
        .route("/api/messages/:id", get(messages::get_message))
        .route("/api/messages/:id/read", post(messages::mark_read))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes where the caller must be the user named in the path.
    let same_user = Router::new()
        .route("/api/users/:username", get(users::get_user))
        .route("/api/users/:username/to", get(users::messages_to_user))
        .route("/api/users/:username/from", get(users::messages_from_user))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_same_user,
        ));

    Router::new()
        // Health check
        .route("/api/health", get(health))
        // Authentication endpoints
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .merge(authenticated)
        .merge(same_user)
        // Add request timeout
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_secs,
        )))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

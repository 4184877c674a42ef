use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;
use crate::auth;
use crate::error::AppError;

/// Caller identity established by the guard, available to handlers as a
/// request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))
}

/// Authentication middleware - the caller must present a token that
/// verifies under the signing secret.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let username = auth::decode_token(token, &state.config.secret_key)?;

    request.extensions_mut().insert(CurrentUser(username));

    Ok(next.run(request).await)
}

/// Same-user middleware - the caller must additionally be the user named
/// in the route path.
pub async fn require_same_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let caller = auth::decode_token(token, &state.config.secret_key)?;

    if !auth::same_user(&caller, &username) {
        return Err(AppError::Unauthorized("Unauthorized".to_string()));
    }

    request.extensions_mut().insert(CurrentUser(caller));

    Ok(next.run(request).await)
}

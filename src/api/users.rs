use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::state::AppState;
use crate::db::{ReceivedMessage, SentMessage, UserProfile, UserRepository, UserSummary};
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Serialize)]
pub struct OutboxResponse {
    pub messages: Vec<SentMessage>,
}

/// GET /api/users (requires auth)
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, AppError> {
    let users = UserRepository::all(&state.db).await?;

    Ok(Json(UsersResponse { users }))
}

/// GET /api/users/:username (requires same user)
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = UserRepository::get(&state.db, &username).await?;

    Ok(Json(UserResponse { user }))
}

/// GET /api/users/:username/to (requires same user)
pub async fn messages_to_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<InboxResponse>, AppError> {
    let messages = UserRepository::messages_to(&state.db, &username).await?;

    Ok(Json(InboxResponse { messages }))
}

/// GET /api/users/:username/from (requires same user)
pub async fn messages_from_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<OutboxResponse>, AppError> {
    let messages = UserRepository::messages_from(&state.db, &username).await?;

    Ok(Json(OutboxResponse { messages }))
}

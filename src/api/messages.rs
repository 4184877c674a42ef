use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::CurrentUser;
use crate::api::state::AppState;
use crate::auth::policy;
use crate::db::{Message, MessageDetail, MessageRepository, ReadReceipt};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub to_username: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MessageDetailResponse {
    pub message: MessageDetail,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct ReadReceiptResponse {
    pub message: ReadReceipt,
}

/// GET /api/messages/:id (requires auth)
///
/// Only the sender or the recipient may view a message. Unknown ids get
/// the same 401 as a denied caller, so the route reveals nothing about
/// which ids exist.
pub async fn get_message(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageDetailResponse>, AppError> {
    let message = match MessageRepository::get(&state.db, &id).await {
        Ok(message) => message,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::Unauthorized("Cannot read this message".to_string()))
        }
        Err(e) => return Err(e),
    };

    if !policy::may_view_message(&caller, &message) {
        return Err(AppError::Unauthorized("Cannot read this message".to_string()));
    }

    Ok(Json(MessageDetailResponse { message }))
}

/// POST /api/messages (requires auth)
pub async fn create_message(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    if req.to_username.is_empty() || req.body.is_empty() {
        return Err(AppError::Validation(
            "to_username and body are required".to_string(),
        ));
    }

    let message = MessageRepository::create(&state.db, &caller, &req.to_username, &req.body).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

/// POST /api/messages/:id/read (requires auth)
///
/// Only the recipient may mark a message read; the check runs before the
/// repository mutation.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ReadReceiptResponse>, AppError> {
    let message = match MessageRepository::get(&state.db, &id).await {
        Ok(message) => message,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::Unauthorized(
                "Cannot set message to read".to_string(),
            ))
        }
        Err(e) => return Err(e),
    };

    if !policy::may_mark_read(&caller, &message) {
        return Err(AppError::Unauthorized(
            "Cannot set message to read".to_string(),
        ));
    }

    let receipt = MessageRepository::mark_read(&state.db, &id).await?;

    Ok(Json(ReadReceiptResponse { message: receipt }))
}

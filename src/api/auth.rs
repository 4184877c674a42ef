use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::auth;
use crate::db::{NewUser, UserRepository};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    if req.username.is_empty()
        || req.password.is_empty()
        || req.first_name.is_empty()
        || req.last_name.is_empty()
        || req.phone.is_empty()
    {
        return Err(AppError::Validation(
            "username, password, first_name, last_name and phone are required".to_string(),
        ));
    }

    let user = UserRepository::register(
        &state.db,
        NewUser {
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
        },
        state.config.hash_work_factor,
    )
    .await?;

    let token = auth::issue_token(&user.username, &state.config.secret_key)?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }

    // An unknown username and a wrong password look identical from
    // outside; only the repository distinguishes them.
    let valid = match UserRepository::authenticate(&state.db, &req.username, &req.password).await {
        Ok(valid) => valid,
        Err(AppError::NotFound(_)) => false,
        Err(e) => return Err(e),
    };

    if !valid {
        return Err(AppError::Validation(
            "Invalid username/password".to_string(),
        ));
    }

    UserRepository::update_login_timestamp(&state.db, &req.username).await?;

    let token = auth::issue_token(&req.username, &state.config.secret_key)?;

    Ok(Json(TokenResponse { token }))
}

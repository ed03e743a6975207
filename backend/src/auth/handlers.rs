use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use common::auth::verify_password;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

use crate::auth::USER_SESSION_KEY;
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    message: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .iter()
        .find(|u| u.username == payload.username)
        .filter(|u| verify_password(&payload.password, &u.password_hash, &u.salt));

    match user {
        Some(user) => {
            session
                .insert(USER_SESSION_KEY, &user.username)
                .await
                .map_err(|err| ApiError::Unavailable(err.to_string()))?;
            info!(user = %user.username, "logged in");
            Ok(Json(LoginResponse {
                success: true,
                message: user.username.clone(),
            }))
        }
        None => Err(ApiError::Unauthorized),
    }
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, ApiError> {
    session
        .delete()
        .await
        .map_err(|err| ApiError::Unavailable(err.to_string()))?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Logged out".into(),
    }))
}

pub async fn check_auth(session: Session) -> impl IntoResponse {
    match session.get::<String>(USER_SESSION_KEY).await.unwrap_or(None) {
        Some(user) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                message: user,
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                message: "Not logged in".into(),
            }),
        ),
    }
}

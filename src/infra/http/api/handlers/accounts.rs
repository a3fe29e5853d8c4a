use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::accounts::RegisterCommand;

use super::super::error::ApiError;
use super::super::models::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use super::super::state::ApiState;
use super::ApiJson;

pub async fn register(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .accounts
        .register(RegisterCommand {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .accounts
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse::from(issued)))
}

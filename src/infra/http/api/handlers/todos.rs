use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::accounts::AuthenticatedUser;

use super::super::error::ApiError;
use super::super::models::{MessageResponse, TodoCreateRequest, TodoUpdateRequest};
use super::super::state::ApiState;
use super::ApiJson;

pub async fn list_todos(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.todos.list(user.user_id).await?))
}

pub async fn get_todo(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.todos.get(user.user_id, id).await?))
}

pub async fn create_todo(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(payload): ApiJson<TodoCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = state.todos.create(user.user_id, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update_todo(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<TodoUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = state
        .todos
        .update(user.user_id, id, &payload.content, payload.is_completed)
        .await?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.todos.delete(user.user_id, id).await?;
    Ok(Json(MessageResponse {
        message: "Todo deleted successfully",
    }))
}

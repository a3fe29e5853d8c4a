use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::accounts::AuthenticatedUser;
use crate::application::documents::DocumentInput;

use super::super::error::ApiError;
use super::super::models::{DocumentRequest, DocumentResponse, MessageResponse};
use super::super::state::ApiState;
use super::ApiJson;

pub async fn list_documents(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.documents.list(user.user_id).await?;
    let body: Vec<DocumentResponse> = documents.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

pub async fn get_document(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.documents.get(user.user_id, id).await?;
    Ok(Json(DocumentResponse::from(document)))
}

pub async fn create_document(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(payload): ApiJson<DocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .documents
        .create(user.user_id, document_input(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::from(record))))
}

pub async fn update_document(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<DocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .documents
        .update(user.user_id, id, document_input(payload))
        .await?;
    Ok(Json(DocumentResponse::from(record)))
}

pub async fn delete_document(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.documents.delete(user.user_id, id).await?;
    Ok(Json(MessageResponse {
        message: "Document deleted successfully",
    }))
}

fn document_input(payload: DocumentRequest) -> DocumentInput {
    DocumentInput {
        title: payload.title,
        content: payload.content,
        format: payload.format,
    }
}

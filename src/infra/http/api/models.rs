use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::accounts::IssuedToken;
use crate::application::documents::DocumentWithContent;
use crate::domain::entities::{DocumentRecord, UserRecord};
use crate::domain::types::DocumentFormat;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<IssuedToken> for LoginResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub format: DocumentFormat,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub format: DocumentFormat,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(record: DocumentRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            format: record.format,
            created_at: record.created_at,
            updated_at: record.updated_at,
            content: None,
        }
    }
}

impl From<DocumentWithContent> for DocumentResponse {
    fn from(document: DocumentWithContent) -> Self {
        Self {
            content: Some(document.content),
            ..Self::from(document.record)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TodoCreateRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct TodoUpdateRequest {
    pub content: String,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CompileLatexRequest {
    pub latex: String,
}

#[derive(Debug, Deserialize)]
pub struct CompileTypstRequest {
    pub typst: String,
}

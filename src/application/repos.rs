//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{DocumentRecord, TodoRecord, UserRecord};
use crate::domain::types::DocumentFormat;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateDocumentParams {
    pub user_id: Uuid,
    pub title: String,
    pub object_storage_key: String,
    pub format: DocumentFormat,
}

#[derive(Debug, Clone)]
pub struct UpdateDocumentParams {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub format: DocumentFormat,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateTodoParams {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_completed: bool,
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
}

/// Document metadata persistence. Every lookup is scoped to the owning user.
#[async_trait]
pub trait DocumentsRepo: Send + Sync {
    async fn create_document(
        &self,
        params: CreateDocumentParams,
    ) -> Result<DocumentRecord, RepoError>;

    async fn find_document(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentRecord>, RepoError>;

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRecord>, RepoError>;

    async fn update_document(
        &self,
        params: UpdateDocumentParams,
    ) -> Result<DocumentRecord, RepoError>;

    async fn delete_document(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TodosRepo: Send + Sync {
    async fn create_todo(&self, user_id: Uuid, content: String) -> Result<TodoRecord, RepoError>;

    async fn find_todo(&self, user_id: Uuid, id: Uuid) -> Result<Option<TodoRecord>, RepoError>;

    async fn list_todos(&self, user_id: Uuid) -> Result<Vec<TodoRecord>, RepoError>;

    async fn update_todo(&self, params: UpdateTodoParams) -> Result<TodoRecord, RepoError>;

    async fn delete_todo(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError>;
}

/// Liveness probe for the backing database.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

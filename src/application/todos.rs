//! Todo CRUD scoped to the owning user.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, TodosRepo, UpdateTodoParams},
    domain::{entities::TodoRecord, error::DomainError},
};

#[derive(Debug, Error)]
pub enum TodoError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("todo not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for TodoError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct TodoService {
    todos: Arc<dyn TodosRepo>,
}

impl TodoService {
    pub fn new(todos: Arc<dyn TodosRepo>) -> Self {
        Self { todos }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<TodoRecord>, TodoError> {
        Ok(self.todos.list_todos(user_id).await?)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<TodoRecord, TodoError> {
        self.todos
            .find_todo(user_id, id)
            .await?
            .ok_or(TodoError::NotFound)
    }

    pub async fn create(&self, user_id: Uuid, content: &str) -> Result<TodoRecord, TodoError> {
        let content = normalize_content(content)?;
        Ok(self.todos.create_todo(user_id, content).await?)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        content: &str,
        is_completed: bool,
    ) -> Result<TodoRecord, TodoError> {
        let content = normalize_content(content)?;
        Ok(self
            .todos
            .update_todo(UpdateTodoParams {
                id,
                user_id,
                content,
                is_completed,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await?)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), TodoError> {
        Ok(self.todos.delete_todo(user_id, id).await?)
    }
}

fn normalize_content(content: &str) -> Result<String, DomainError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("content must not be empty"));
    }
    Ok(trimmed.to_string())
}

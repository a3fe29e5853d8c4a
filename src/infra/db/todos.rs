use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, TodosRepo, UpdateTodoParams},
    domain::entities::TodoRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TodoRow {
    id: Uuid,
    user_id: Uuid,
    content: String,
    is_completed: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<TodoRow> for TodoRecord {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            is_completed: row.is_completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TodosRepo for PostgresRepositories {
    async fn create_todo(&self, user_id: Uuid, content: String) -> Result<TodoRecord, RepoError> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            INSERT INTO todos (id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, content, is_completed, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_todo(&self, user_id: Uuid, id: Uuid) -> Result<Option<TodoRecord>, RepoError> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            SELECT id, user_id, content, is_completed, created_at, updated_at
            FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TodoRecord::from))
    }

    async fn list_todos(&self, user_id: Uuid) -> Result<Vec<TodoRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TodoRow>(
            r#"
            SELECT id, user_id, content, is_completed, created_at, updated_at
            FROM todos
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TodoRecord::from).collect())
    }

    async fn update_todo(&self, params: UpdateTodoParams) -> Result<TodoRecord, RepoError> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            UPDATE todos
            SET content = $3, is_completed = $4, updated_at = $5
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, content, is_completed, created_at, updated_at
            "#,
        )
        .bind(params.id)
        .bind(params.user_id)
        .bind(&params.content)
        .bind(params.is_completed)
        .bind(params.updated_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_todo(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

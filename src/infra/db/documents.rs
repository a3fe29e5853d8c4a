use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateDocumentParams, DocumentsRepo, RepoError, UpdateDocumentParams},
    domain::{entities::DocumentRecord, types::DocumentFormat},
};

use super::{PostgresRepositories, map_sqlx_error};

const DOCUMENT_COLUMNS: &str =
    "id, user_id, title, object_storage_key, format, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    object_storage_key: String,
    format: DocumentFormat,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<DocumentRow> for DocumentRecord {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            object_storage_key: row.object_storage_key,
            format: row.format,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl DocumentsRepo for PostgresRepositories {
    async fn create_document(
        &self,
        params: CreateDocumentParams,
    ) -> Result<DocumentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO documents (id, user_id, title, object_storage_key, format) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {DOCUMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.user_id)
            .bind(&params.title)
            .bind(&params.object_storage_key)
            .bind(params.format)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_document(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentRecord>, RepoError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(DocumentRecord::from))
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentRecord>, RepoError> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(DocumentRecord::from).collect())
    }

    async fn update_document(
        &self,
        params: UpdateDocumentParams,
    ) -> Result<DocumentRecord, RepoError> {
        let sql = format!(
            "UPDATE documents SET title = $3, format = $4, updated_at = $5 \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {DOCUMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(params.id)
            .bind(params.user_id)
            .bind(&params.title)
            .bind(params.format)
            .bind(params.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_document(&self, user_id: Uuid, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND user_id = $2")
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

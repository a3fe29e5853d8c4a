//! Document CRUD: metadata in the repository, content in the blob store.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        repos::{CreateDocumentParams, DocumentsRepo, RepoError, UpdateDocumentParams},
        storage::{BlobStore, StorageError},
    },
    domain::{entities::DocumentRecord, error::DomainError, types::DocumentFormat},
};

const MAX_TITLE_CHARS: usize = 255;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("document not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
    #[error("blob storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("stored content for document `{id}` is not valid UTF-8")]
    CorruptContent { id: Uuid },
}

impl From<RepoError> for DocumentError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub title: String,
    pub content: String,
    pub format: DocumentFormat,
}

#[derive(Debug, Clone)]
pub struct DocumentWithContent {
    pub record: DocumentRecord,
    pub content: String,
}

#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentsRepo>,
    blobs: Arc<dyn BlobStore>,
    bucket: String,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentsRepo>,
        blobs: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            documents,
            blobs,
            bucket: bucket.into(),
        }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<DocumentRecord>, DocumentError> {
        Ok(self.documents.list_documents(user_id).await?)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<DocumentWithContent, DocumentError> {
        let record = self.find_owned(user_id, id).await?;
        let bytes = self
            .blobs
            .get(&self.bucket, &record.object_storage_key)
            .await?;
        let content = String::from_utf8(bytes.to_vec())
            .map_err(|_| DocumentError::CorruptContent { id: record.id })?;
        Ok(DocumentWithContent { record, content })
    }

    /// Upload the content under a fresh key, then insert the metadata row.
    /// The blob is removed again when the insert fails.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: DocumentInput,
    ) -> Result<DocumentRecord, DocumentError> {
        let title = normalize_title(&input.title)?;
        let key = Uuid::new_v4().to_string();

        self.blobs
            .put(&self.bucket, &key, Bytes::from(input.content))
            .await?;

        let created = self
            .documents
            .create_document(CreateDocumentParams {
                user_id,
                title,
                object_storage_key: key.clone(),
                format: input.format,
            })
            .await;

        match created {
            Ok(record) => {
                info!(
                    target = "notepress::documents",
                    op = "documents::create",
                    user_id = %user_id,
                    document_id = %record.id,
                    format = record.format.as_str(),
                    "Document created"
                );
                Ok(record)
            }
            Err(err) => {
                if let Err(cleanup) = self.blobs.delete(&self.bucket, &key).await {
                    warn!(
                        target = "notepress::documents",
                        op = "documents::create",
                        result = "orphaned_blob",
                        bucket = %self.bucket,
                        key = %key,
                        error = %cleanup,
                        "Failed to remove uploaded content after insert failure"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Overwrite the content at the existing key, then update the metadata.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: DocumentInput,
    ) -> Result<DocumentRecord, DocumentError> {
        let title = normalize_title(&input.title)?;
        let existing = self.find_owned(user_id, id).await?;

        self.blobs
            .put(
                &self.bucket,
                &existing.object_storage_key,
                Bytes::from(input.content),
            )
            .await?;

        let record = self
            .documents
            .update_document(UpdateDocumentParams {
                id,
                user_id,
                title,
                format: input.format,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await?;
        Ok(record)
    }

    /// Remove the content, then the metadata row.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DocumentError> {
        let existing = self.find_owned(user_id, id).await?;
        self.blobs
            .delete(&self.bucket, &existing.object_storage_key)
            .await?;
        self.documents.delete_document(user_id, id).await?;

        info!(
            target = "notepress::documents",
            op = "documents::delete",
            user_id = %user_id,
            document_id = %id,
            "Document deleted"
        );
        Ok(())
    }

    async fn find_owned(&self, user_id: Uuid, id: Uuid) -> Result<DocumentRecord, DocumentError> {
        self.documents
            .find_document(user_id, id)
            .await?
            .ok_or(DocumentError::NotFound)
    }
}

fn normalize_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(DomainError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

//! Blob storage abstraction for document content.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Object store holding raw document content, addressed by bucket and key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create or overwrite the object.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StorageError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;

    /// Remove the object. Missing objects are treated as success.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

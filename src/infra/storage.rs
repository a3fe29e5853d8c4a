//! Filesystem-backed blob store: one directory per bucket under a root.

use std::{
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::application::storage::{BlobStore, StorageError};

#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Create the bucket directory when it does not exist yet.
    pub fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let dir = self.bucket_dir(bucket)?;
        std::fs::create_dir_all(dir)?;
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        if !is_single_segment(bucket) {
            return Err(StorageError::InvalidKey(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(dir.join(relative))
    }
}

fn is_single_segment(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StorageError> {
        let target = self.resolve(bucket, key)?;
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(&parent).await?;

        // Write to a sibling temp file and rename so readers never see partial content.
        tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
            let mut file = tempfile::Builder::new()
                .prefix(".blob-")
                .tempfile_in(&parent)?;
            file.write_all(&data)?;
            file.as_file().sync_all()?;
            file.persist(&target).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(|err| StorageError::Io(std::io::Error::other(err)))??;

        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let path = self.resolve(bucket, key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(bucket, key)?;
        match fs::remove_file(&path).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, FilesystemBlobStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = FilesystemBlobStore::new(dir.path().join("blobs")).expect("store");
        store.ensure_bucket("documents").expect("bucket");
        (dir, store)
    }

    #[tokio::test]
    async fn put_overwrites_and_get_reads_back() {
        let (_dir, store) = store();
        store
            .put("documents", "a1", Bytes::from_static(b"first"))
            .await
            .expect("put");
        store
            .put("documents", "a1", Bytes::from_static(b"second"))
            .await
            .expect("overwrite");

        let data = store.get("documents", "a1").await.expect("get");
        assert_eq!(&data[..], b"second");
    }

    #[tokio::test]
    async fn missing_objects() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get("documents", "nope").await,
            Err(StorageError::NotFound { .. })
        ));
        store
            .delete("documents", "nope")
            .await
            .expect("deleting a missing object succeeds");
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let (_dir, store) = store();
        for key in ["../outside", "/etc/passwd", ""] {
            assert!(matches!(
                store.put("documents", key, Bytes::new()).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
        assert!(matches!(
            store.get("../documents", "a1").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}

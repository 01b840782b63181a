//! Media store adapter
//!
//! `MediaStore` pins every operation to the fixed media bucket and adds key
//! validation and logging on top of an [`ObjectBackend`]. It is cheap to clone;
//! all clones share one connection handle.
//!
//! Every operation returns its error to the caller. Whether a failure is fatal
//! is decided by the application, not here.

use crate::keys::validate_key;
use crate::traits::{
    read_to_bytes, InitError, ListStream, ObjectBackend, ObjectStream, StorageError,
    StorageResult,
};
use bytes::Bytes;
use futures::TryStreamExt;
use mediastore_core::constants::{BUCKET_NAME, BUCKET_REGION, DEFAULT_CONTENT_TYPE};
use mediastore_core::{MediaDescriptor, StorageConfig};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncRead;

#[derive(Clone)]
pub struct MediaStore {
    backend: Arc<dyn ObjectBackend>,
    bucket: &'static str,
}

impl MediaStore {
    /// Connect to an S3-compatible endpoint and make sure the media bucket
    /// exists.
    ///
    /// # Arguments
    /// * `endpoint` - `host[:port]` of the service
    /// * `access_key_id` / `secret_access_key` - credentials
    /// * `use_ssl` - use https
    #[cfg(feature = "storage-s3")]
    pub async fn init(
        endpoint: &str,
        access_key_id: &str,
        secret_access_key: &str,
        use_ssl: bool,
    ) -> Result<Self, InitError> {
        let backend =
            crate::S3Backend::new(endpoint, access_key_id, secret_access_key, use_ssl).await?;
        Self::initialize(Arc::new(backend)).await
    }

    /// Build the backend described by `config` and initialize the store on it.
    pub async fn connect(config: &StorageConfig) -> Result<Self, InitError> {
        let backend = crate::factory::create_backend(config).await?;
        Self::initialize(backend).await
    }

    /// Initialize the store on an existing backend, creating the media bucket
    /// when it is missing.
    ///
    /// Safe to call repeatedly: an existing bucket is left alone.
    pub async fn initialize(backend: Arc<dyn ObjectBackend>) -> Result<Self, InitError> {
        let bucket = BUCKET_NAME;

        let found = backend
            .bucket_exists(bucket)
            .await
            .map_err(|source| {
                tracing::error!(error = %source, bucket = %bucket, "Can't find bucket");
                InitError::BucketLookup {
                    bucket: bucket.to_string(),
                    source,
                }
            })?;

        if !found {
            tracing::warn!(
                bucket = %bucket,
                region = %BUCKET_REGION,
                "Bucket does not exist, creating it"
            );

            backend
                .make_bucket(bucket, BUCKET_REGION)
                .await
                .map_err(|source| {
                    tracing::error!(error = %source, bucket = %bucket, "Can't create bucket");
                    InitError::BucketCreation {
                        bucket: bucket.to_string(),
                        source,
                    }
                })?;
        }

        tracing::info!(
            bucket = %bucket,
            backend = %backend.backend_type(),
            "Media store initialized"
        );

        Ok(MediaStore { backend, bucket })
    }

    pub fn bucket(&self) -> &str {
        self.bucket
    }

    pub fn backend(&self) -> &Arc<dyn ObjectBackend> {
        &self.backend
    }

    /// List every object under `prefix` (recursively) into memory.
    ///
    /// The first page error aborts the listing and partial results are
    /// dropped. Order is whatever the backend returns.
    pub async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<MediaDescriptor>> {
        let start = Instant::now();

        let media = self
            .list_objects_stream(prefix)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Listing failed"
                );
                e
            })?;

        tracing::debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            count = media.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Listing successful"
        );

        Ok(media)
    }

    /// Lazy variant of [`list_objects`](Self::list_objects); pages are fetched
    /// as the stream is polled.
    pub fn list_objects_stream<'a>(&'a self, prefix: &'a str) -> ListStream<'a> {
        self.backend.list_objects(self.bucket, prefix)
    }

    /// Open an object for reading.
    pub async fn get_object(&self, name: &str) -> StorageResult<ObjectStream> {
        validate_key(name)?;

        self.backend
            .get_object(self.bucket, name)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    tracing::debug!(bucket = %self.bucket, key = %name, "Object not found");
                } else {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %name,
                        "Can't get object"
                    );
                }
                e
            })
    }

    /// Read a whole object into memory.
    pub async fn get_object_bytes(&self, name: &str) -> StorageResult<Bytes> {
        let stream = self.get_object(name).await?;
        read_to_bytes(stream).await
    }

    /// Store the reader's contents under `name`, replacing any existing
    /// object. The content type is always `application/octet-stream`.
    pub async fn upload<R>(&self, name: &str, reader: R) -> StorageResult<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        validate_key(name)?;
        let start = Instant::now();

        let size = self
            .backend
            .put_object(self.bucket, name, DEFAULT_CONTENT_TYPE, Box::pin(reader))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %name,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Can't upload file"
                );
                e
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload successful"
        );

        Ok(())
    }

    /// Delete an object.
    pub async fn remove(&self, name: &str) -> StorageResult<()> {
        validate_key(name)?;
        let start = Instant::now();

        self.backend
            .remove_object(self.bucket, name)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %name,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Can't remove file"
                );
                e
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remove successful"
        );

        Ok(())
    }

    /// Rename an object by server-side copy followed by a delete.
    ///
    /// Not atomic. If the copy fails nothing changed. If the delete fails
    /// after a successful copy, both keys exist and
    /// [`StorageError::RenameIncomplete`] is returned so the caller can
    /// reconcile.
    pub async fn rename(&self, name: &str, new_name: &str) -> StorageResult<()> {
        validate_key(name)?;
        validate_key(new_name)?;

        if name == new_name {
            return Err(StorageError::InvalidKey(format!(
                "can't rename {:?} onto itself",
                name
            )));
        }

        let start = Instant::now();

        self.backend
            .copy_object(self.bucket, name, new_name)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    from_key = %name,
                    to_key = %new_name,
                    "Can't rename file"
                );
                e
            })?;

        if let Err(e) = self.backend.remove_object(self.bucket, name).await {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                from_key = %name,
                to_key = %new_name,
                "Rename copied the object but could not remove the original"
            );
            return Err(StorageError::RenameIncomplete {
                from: name.to_string(),
                to: new_name.to_string(),
                source: Box::new(e),
            });
        }

        tracing::info!(
            bucket = %self.bucket,
            from_key = %name,
            to_key = %new_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Rename successful"
        );

        Ok(())
    }
}

#[cfg(all(test, feature = "storage-memory"))]
mod tests {
    use super::*;
    use crate::MemoryBackend;

    async fn memory_store() -> MediaStore {
        MediaStore::initialize(Arc::new(MemoryBackend::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_uses_fixed_bucket() {
        let store = memory_store().await;
        assert_eq!(store.bucket(), "media");
        assert!(store.backend().bucket_exists("media").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_keys_never_reach_backend() {
        let store = memory_store().await;

        assert!(matches!(
            store.upload("", std::io::Cursor::new(Vec::new())).await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get_object("../escape").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.remove("/absolute").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_keys_with_empty_or_dot_segments_rejected() {
        let store = memory_store().await;

        for key in ["folder/", "a//b", "clips/./a.mp4"] {
            let result = store.upload(key, std::io::Cursor::new(b"x".to_vec())).await;
            assert!(matches!(result, Err(StorageError::InvalidKey(_))), "{key}");
        }
        assert!(store.list_objects("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_onto_itself_rejected() {
        let store = memory_store().await;
        store
            .upload("same", std::io::Cursor::new(b"data".to_vec()))
            .await
            .unwrap();

        let result = store.rename("same", "same").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert_eq!(
            store.get_object_bytes("same").await.unwrap(),
            Bytes::from_static(b"data")
        );
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let store = memory_store().await;
        store
            .upload("clip", std::io::Cursor::new(b"first".to_vec()))
            .await
            .unwrap();
        store
            .upload("clip", std::io::Cursor::new(b"second".to_vec()))
            .await
            .unwrap();

        assert_eq!(
            store.get_object_bytes("clip").await.unwrap(),
            Bytes::from_static(b"second")
        );
        assert_eq!(store.list_objects("").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_with_memory_config() {
        let store = MediaStore::connect(&StorageConfig::memory()).await.unwrap();
        assert!(store.list_objects("").await.unwrap().is_empty());
    }
}

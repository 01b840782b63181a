use crate::traits::{
    ListStream, ObjectBackend, ObjectReader, ObjectStream, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{future, stream, StreamExt};
use mediastore_core::MediaDescriptor;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectMeta, ObjectStore, ObjectStoreExt, PutPayload};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::io::AsyncReadExt;

/// In-process object storage
///
/// Each bucket is an independent `object_store` in-memory store. Cloning the
/// backend shares the buckets, so a clone observes every write of the
/// original.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    buckets: Arc<RwLock<HashMap<String, Arc<InMemory>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets created so far
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().map(|b| b.len()).unwrap_or(0)
    }

    fn bucket(&self, bucket: &str) -> StorageResult<Arc<InMemory>> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| StorageError::BackendError("bucket registry poisoned".to_string()))?;

        buckets
            .get(bucket)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("bucket {}", bucket)))
    }
}

/// Map an object key onto a store path, refusing keys the path type would
/// silently rewrite (trailing or doubled `/`).
///
/// `MediaStore` already refuses such keys through `validate_key`; this check
/// covers callers that drive the backend directly.
fn object_path(key: &str) -> StorageResult<Path> {
    let path = Path::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))?;
    let normalized: &str = path.as_ref();
    if normalized != key {
        return Err(StorageError::InvalidKey(format!(
            "key {:?} is not representable in the in-memory store",
            key
        )));
    }
    Ok(path)
}

/// Deepest whole-segment directory covering `prefix`.
///
/// The store lists by path segment, so `b/c` is listed from `b` and filtered
/// afterwards.
fn list_root(prefix: &str) -> Option<Path> {
    let (dir, _) = prefix.rsplit_once('/')?;
    if dir.is_empty() {
        return None;
    }
    Path::parse(dir).ok()
}

fn map_store_error(err: ObjectStoreError, key: &str) -> StorageError {
    match err {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
        ObjectStoreError::PermissionDenied { .. } | ObjectStoreError::Unauthenticated { .. } => {
            StorageError::PermissionDenied(format!("{}: {}", key, err))
        }
        ObjectStoreError::InvalidPath { .. } => StorageError::InvalidKey(err.to_string()),
        other => StorageError::BackendError(other.to_string()),
    }
}

fn descriptor(meta: ObjectMeta) -> MediaDescriptor {
    MediaDescriptor::new(meta.location.to_string(), meta.size, meta.last_modified)
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| StorageError::BackendError("bucket registry poisoned".to_string()))?;
        Ok(buckets.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> StorageResult<()> {
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| StorageError::BackendError("bucket registry poisoned".to_string()))?;

        buckets.entry(bucket.to_string()).or_insert_with(|| {
            tracing::debug!(bucket = %bucket, region = %region, "In-memory bucket created");
            Arc::new(InMemory::new())
        });

        Ok(())
    }

    fn list_objects<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ListStream<'a> {
        let store = match self.bucket(bucket) {
            Ok(store) => store,
            Err(e) => return Box::pin(stream::once(future::ready(Err::<MediaDescriptor, _>(e)))),
        };

        let root = list_root(prefix);
        let stream = store.list(root.as_ref()).filter_map(move |item| {
            future::ready(match item {
                Ok(meta) => {
                    let location: &str = meta.location.as_ref();
                    location.starts_with(prefix).then(|| Ok(descriptor(meta)))
                }
                Err(e) => Some(Err(map_store_error(e, prefix))),
            })
        });

        Box::pin(stream)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        let store = self.bucket(bucket)?;
        let location = object_path(key)?;

        let result = store
            .get(&location)
            .await
            .map_err(|e| map_store_error(e, key))?;

        let key = key.to_string();
        let stream = result
            .into_stream()
            .map(move |chunk| chunk.map_err(|e| map_store_error(e, &key)));

        Ok(Box::pin(stream))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        mut reader: ObjectReader,
    ) -> StorageResult<u64> {
        let store = self.bucket(bucket)?;
        let location = object_path(key)?;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        let size = buffer.len() as u64;

        store
            .put(&location, PutPayload::from(Bytes::from(buffer)))
            .await
            .map_err(|e| map_store_error(e, key))?;

        Ok(size)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let store = self.bucket(bucket)?;
        let location = object_path(key)?;

        store
            .delete(&location)
            .await
            .map_err(|e| map_store_error(e, key))
    }

    async fn copy_object(&self, bucket: &str, from_key: &str, to_key: &str) -> StorageResult<()> {
        let store = self.bucket(bucket)?;
        let from = object_path(from_key)?;
        let to = object_path(to_key)?;

        store
            .copy(&from, &to)
            .await
            .map_err(|e| map_store_error(e, from_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

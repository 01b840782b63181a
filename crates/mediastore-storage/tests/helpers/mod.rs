//! Test helpers: in-memory stores and a backend that fails on demand.
//!
//! Run from workspace root: `cargo test -p mediastore-storage`.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use mediastore_storage::{
    ListStream, MediaStore, MemoryBackend, ObjectBackend, ObjectReader, ObjectStream,
    StorageBackend, StorageError, StorageResult,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Build an initialized store over a fresh in-memory backend.
pub async fn memory_store() -> (MediaStore, MemoryBackend) {
    let backend = MemoryBackend::new();
    let store = MediaStore::initialize(Arc::new(backend.clone()))
        .await
        .expect("Failed to initialize in-memory store");
    (store, backend)
}

/// Wraps a `MemoryBackend` and injects failures into selected operations.
#[derive(Clone, Default)]
pub struct FaultyBackend {
    pub inner: MemoryBackend,
    pub fail_bucket_lookup: Arc<AtomicBool>,
    pub fail_bucket_creation: Arc<AtomicBool>,
    pub fail_copy: Arc<AtomicBool>,
    pub fail_remove: Arc<AtomicBool>,
    /// Number of listing entries to yield before failing; `usize::MAX` never fails
    pub fail_listing_after: Arc<AtomicUsize>,
    pub make_bucket_calls: Arc<AtomicUsize>,
}

impl FaultyBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.fail_listing_after.store(usize::MAX, Ordering::SeqCst);
        backend
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }
}

fn injected(operation: &str) -> StorageError {
    StorageError::Transport(format!("injected {} failure", operation))
}

#[async_trait]
impl ObjectBackend for FaultyBackend {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        if self.fail_bucket_lookup.load(Ordering::SeqCst) {
            return Err(injected("bucket lookup"));
        }
        self.inner.bucket_exists(bucket).await
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> StorageResult<()> {
        self.make_bucket_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_bucket_creation.load(Ordering::SeqCst) {
            return Err(StorageError::PermissionDenied(
                "injected bucket creation failure".to_string(),
            ));
        }
        self.inner.make_bucket(bucket, region).await
    }

    fn list_objects<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ListStream<'a> {
        let limit = self.fail_listing_after.load(Ordering::SeqCst);
        if limit == usize::MAX {
            return self.inner.list_objects(bucket, prefix);
        }

        let failure = stream::once(async { Err(injected("listing")) });
        Box::pin(self.inner.list_objects(bucket, prefix).take(limit).chain(failure))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        self.inner.get_object(bucket, key).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        reader: ObjectReader,
    ) -> StorageResult<u64> {
        self.inner
            .put_object(bucket, key, content_type, reader)
            .await
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(injected("remove"));
        }
        self.inner.remove_object(bucket, key).await
    }

    async fn copy_object(&self, bucket: &str, from_key: &str, to_key: &str) -> StorageResult<()> {
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(injected("copy"));
        }
        self.inner.copy_object(bucket, from_key, to_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

//! Storage abstraction trait
//!
//! This module defines the `ObjectBackend` trait that every object-storage
//! client wrapper implements, together with the error contract shared by all
//! operations.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use mediastore_core::MediaDescriptor;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The copy step of a rename succeeded but removing the source did not;
    /// both keys now exist.
    #[error("Rename of {from} to {to} incomplete, both keys exist: {source}")]
    RenameIncomplete {
        from: String,
        to: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Initialization errors
///
/// Returned instead of terminating the process; the application entry point
/// decides whether a failed startup is fatal.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Invalid storage configuration: {0}")]
    Config(String),

    #[error("Can't find bucket {bucket}: {source}")]
    BucketLookup {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error("Can't create bucket {bucket}: {source}")]
    BucketCreation {
        bucket: String,
        #[source]
        source: StorageError,
    },
}

/// Object body, yielded chunk by chunk.
pub type ObjectStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Lazy listing; each page is requested only when the previous one is drained.
pub type ListStream<'a> = Pin<Box<dyn Stream<Item = StorageResult<MediaDescriptor>> + Send + 'a>>;

/// Caller-supplied upload body.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Object storage client abstraction
///
/// Implementations wrap an S3-compatible client (or an in-process stand-in)
/// and must be safe to share between tasks. Every method takes the bucket
/// explicitly; the adapter in [`crate::store`] pins it to the fixed bucket.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Check whether a bucket exists and is reachable with our credentials
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Create a bucket in the given region
    ///
    /// Creating a bucket that we already own is not an error.
    async fn make_bucket(&self, bucket: &str, region: &str) -> StorageResult<()>;

    /// List every object whose key starts with `prefix`, recursively
    fn list_objects<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ListStream<'a>;

    /// Open an object for reading
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream>;

    /// Write an object from a reader, consuming it until EOF
    ///
    /// # Returns
    /// The number of bytes written
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        reader: ObjectReader,
    ) -> StorageResult<u64>;

    /// Delete an object
    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Server-side copy within one bucket
    async fn copy_object(&self, bucket: &str, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Drain an object stream into a single buffer.
pub async fn read_to_bytes(mut stream: ObjectStream) -> StorageResult<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

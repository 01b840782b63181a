#[cfg(feature = "storage-memory")]
use crate::MemoryBackend;
#[cfg(feature = "storage-s3")]
use crate::S3Backend;
use crate::{InitError, ObjectBackend, StorageBackend};
use mediastore_core::StorageConfig;
use std::sync::Arc;

/// Create an object backend based on configuration
///
/// This only builds the connection handle; bucket setup happens in
/// [`crate::MediaStore::initialize`].
pub async fn create_backend(config: &StorageConfig) -> Result<Arc<dyn ObjectBackend>, InitError> {
    config
        .validate()
        .map_err(|e| InitError::Config(e.to_string()))?;

    match config.backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let backend = S3Backend::from_config(config).await?;
            Ok(Arc::new(backend))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(InitError::Config(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => Ok(Arc::new(MemoryBackend::new())),

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(InitError::Config(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "storage-memory")]
    #[tokio::test]
    async fn test_creates_memory_backend() {
        let backend = create_backend(&StorageConfig::memory()).await.unwrap();
        assert_eq!(backend.backend_type(), StorageBackend::Memory);
    }

    #[tokio::test]
    async fn test_invalid_config_is_init_error() {
        let config = StorageConfig::s3("", "minio", "minio123", false);
        let result = create_backend(&config).await;
        assert!(matches!(result, Err(InitError::Config(_))));
    }

    #[cfg(feature = "storage-s3")]
    #[tokio::test]
    async fn test_creates_s3_backend() {
        let config = StorageConfig::s3("localhost:9000", "minio", "minio123", false);
        let backend = create_backend(&config).await.unwrap();
        assert_eq!(backend.backend_type(), StorageBackend::S3);
    }
}

//! Mediastore Storage Library
//!
//! This crate provides the media store adapter and the object-storage
//! backends it runs on: an S3-compatible client and an in-process store.
//!
//! # Bucket layout
//!
//! Every object lives in one fixed bucket (`media`, region `us-east-1`, see
//! `mediastore_core::constants`). [`MediaStore::initialize`] creates it when
//! it is missing. Keys are validated once, in the adapter, before any backend
//! sees them.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod store;
pub mod traits;

// Re-export commonly used types
pub use factory::create_backend;
pub use mediastore_core::StorageBackend;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Backend;
pub use store::MediaStore;
pub use traits::{
    read_to_bytes, InitError, ListStream, ObjectBackend, ObjectReader, ObjectStream,
    StorageError, StorageResult,
};

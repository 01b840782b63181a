//! Mediastore Core Library
//!
//! This crate provides the configuration, constants and domain models shared by
//! the storage adapter and the command-line entry point.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::StorageConfig;
pub use models::MediaDescriptor;
pub use storage_types::StorageBackend;

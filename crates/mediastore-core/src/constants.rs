//! Fixed storage layout.
//!
//! The adapter works against exactly one bucket. Pointing it at another bucket
//! or region means changing these values, not passing a parameter.

/// Name of the bucket holding every media object.
pub const BUCKET_NAME: &str = "media";

/// Region the bucket is created in when it does not exist yet.
pub const BUCKET_REGION: &str = "us-east-1";

/// Content type attached to every upload, whatever the payload.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Longest object key accepted by S3-compatible services, in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

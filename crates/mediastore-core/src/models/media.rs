use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored object as reported by a bucket listing.
///
/// The storage service is the source of truth; descriptors are snapshots and
/// are never persisted by this workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    /// Object key, unique within the bucket
    pub name: String,
    /// Size in bytes
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl MediaDescriptor {
    pub fn new(name: impl Into<String>, size: u64, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size,
            last_modified,
        }
    }

    /// Final path segment of the key, i.e. the file name without its folder.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

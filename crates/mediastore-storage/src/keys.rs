//! Object key validation shared by every backend.

use crate::{StorageError, StorageResult};
use mediastore_core::constants::MAX_KEY_LENGTH;

/// Reject keys that no backend should ever see.
///
/// Keys must be non-empty, at most [`MAX_KEY_LENGTH`] bytes and must not
/// start with `/`. Every `/`-separated segment must be non-empty and neither
/// `.` nor `..`, so `folder/` and `a//b` are refused on every backend.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".to_string()));
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(StorageError::InvalidKey(format!(
            "key is {} bytes long, the limit is {}",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }

    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "key {:?} must not start with '/'",
            key
        )));
    }

    for segment in key.split('/') {
        match segment {
            "" => {
                return Err(StorageError::InvalidKey(format!(
                    "key {:?} contains an empty segment",
                    key
                )))
            }
            "." | ".." => {
                return Err(StorageError::InvalidKey(format!(
                    "key {:?} contains a {:?} segment",
                    key, segment
                )))
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_nested_keys() {
        assert!(validate_key("a").is_ok());
        assert!(validate_key("videos/2024/intro.mp4").is_ok());
        assert!(validate_key("name..with..dots.png").is_ok());
    }

    #[test]
    fn rejects_empty_and_absolute_keys() {
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(
            validate_key("/etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_parent_segments() {
        assert!(matches!(
            validate_key("../secret"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            validate_key("a/../b"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn rejects_empty_and_dot_segments() {
        for key in ["folder/", "a//b", "clips/./a.mp4", "./a", "a/."] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{key} should be rejected"
            );
        }
        assert!(validate_key(".hidden/a").is_ok());
    }

    #[test]
    fn rejects_overlong_keys() {
        let key = "k".repeat(MAX_KEY_LENGTH + 1);
        assert!(matches!(validate_key(&key), Err(StorageError::InvalidKey(_))));
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH)).is_ok());
    }
}

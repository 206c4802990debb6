//! Content hashes identifying descriptors
//!
//! A hash is SHA-256 over the canonical JSON of a descriptor's identifying
//! fields (keys sorted), truncated to 20 bytes and hex-encoded. Hashes that
//! arrive over the wire are kept verbatim and never re-validated.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

const HASH_BYTES: usize = 20;

/// Hex-encoded content hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash of a container's `{containerPath, containerIndex}`
    pub fn container(path: &str, index: usize) -> Self {
        Self::of(&json!({ "containerPath": path, "containerIndex": index }))
    }

    /// Hash of an element's `{containerHash, elementPath, elementIndex}`
    pub fn element(container: &ContentHash, path: &str, index: usize) -> Self {
        Self::of(&json!({
            "containerHash": container.as_str(),
            "elementPath": path,
            "elementIndex": index,
        }))
    }

    fn of(value: &serde_json::Value) -> Self {
        // `Value` objects keep their keys sorted, so this rendering is canonical
        let digest = Sha256::digest(value.to_string().as_bytes());
        Self(hex::encode(&digest[..HASH_BYTES]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_hash_deterministic() {
        assert_eq!(ContentHash::container("//form", 0), ContentHash::container("//form", 0));
        assert_ne!(ContentHash::container("//form", 0), ContentHash::container("//form", 1));
        assert_ne!(ContentHash::container("//form", 0), ContentHash::container("//div", 0));
    }

    #[test]
    fn test_hash_shape() {
        let hash = ContentHash::container("//html", 0);
        assert_eq!(hash.as_str().len(), HASH_BYTES * 2);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_element_hash_depends_on_container() {
        let a = ContentHash::container("//form", 0);
        let b = ContentHash::container("//form", 1);
        assert_ne!(ContentHash::element(&a, "./input", 0), ContentHash::element(&b, "./input", 0));
    }

    #[test]
    fn test_wire_form_is_a_plain_string() {
        let hash: ContentHash = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(hash.as_str(), "abc123");
        assert_eq!(serde_json::to_string(&hash).unwrap(), "\"abc123\"");
    }
}

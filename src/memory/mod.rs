//! Assistant conversation memory
//!
//! Conversations are partitioned by a [`MemoryKey`]: a resource (the user)
//! and a thread inside it, both derived deterministically from the caller id.

pub mod conversation;
pub mod store;

pub use conversation::ConversationMemory;
pub use store::{ConversationHistory, ConversationMessage, MessageRole};

use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Seed used when a chat request carries no user id.
pub const ANONYMOUS_USER: &str = "anonymous-user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryKey {
    pub resource_id: Uuid,
    pub thread_id: Uuid,
}

impl MemoryKey {
    /// Key for a caller; blank or missing ids share the anonymous partition.
    pub fn for_user(user_id: Option<&str>) -> Self {
        let seed = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(ANONYMOUS_USER);

        Self {
            resource_id: stable_uuid_from_string(seed),
            thread_id: stable_uuid_from_string(&format!("{}:thread", seed)),
        }
    }
}

impl fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_id, self.thread_id)
    }
}

/// Deterministic v4-shaped UUID from the SHA-256 of `input`.
pub fn stable_uuid_from_string(input: &str) -> Uuid {
    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Short hex digest of a caller id, for logs.
pub fn caller_fingerprint(user_id: Option<&str>) -> String {
    let seed = user_id.unwrap_or(ANONYMOUS_USER);
    hex::encode(&Sha256::digest(seed.as_bytes())[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("u1");
        let b = stable_uuid_from_string("u1");
        assert_eq!(a, b);
        assert_ne!(a, stable_uuid_from_string("u2"));
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn test_keys_partition_by_user() {
        let ana = MemoryKey::for_user(Some("u1"));
        assert_eq!(ana, MemoryKey::for_user(Some(" u1 ")));
        assert_ne!(ana, MemoryKey::for_user(Some("u2")));
        assert_ne!(ana.resource_id, ana.thread_id);

        let anonymous = MemoryKey::for_user(None);
        assert_eq!(anonymous, MemoryKey::for_user(Some("   ")));
        assert_eq!(anonymous, MemoryKey::for_user(Some(ANONYMOUS_USER)));
    }

    #[test]
    fn test_fingerprint_hides_raw_id() {
        let fp = caller_fingerprint(Some("ana@example.com"));
        assert_eq!(fp.len(), 12);
        assert!(!fp.contains("ana"));
    }
}

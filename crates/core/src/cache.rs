//! Response cache trait — content-addressed store of prior verdicts.
//!
//! Entries are keyed by what was said and between whom, never by message
//! id, so a resubmitted identical text reuses the earlier verdict.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use crate::analysis::AnalysisResult;
use crate::error::CacheError;

/// Deterministic key for a `(text, sender, receiver)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hex SHA-256 of `lowercase(trim(text)) | sender | receiver`.
    pub fn compute(text: &str, sender_id: &str, receiver_id: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update(b"|");
        hasher.update(sender_id.as_bytes());
        hasher.update(b"|");
        hasher.update(receiver_id.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Prefix is plenty for log correlation.
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}

/// Storage for analysis verdicts.
///
/// Implementations must bound their memory use.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn get(&self, key: &CacheKey) -> Result<Option<AnalysisResult>, CacheError>;

    async fn set(&self, key: CacheKey, result: AnalysisResult) -> Result<(), CacheError>;

    async fn len(&self) -> Result<usize, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_case_and_outer_whitespace() {
        let a = CacheKey::compute("  You NEVER listen ", "alice", "bob");
        let b = CacheKey::compute("you never listen", "alice", "bob");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn key_depends_on_direction() {
        let ab = CacheKey::compute("hello", "alice", "bob");
        let ba = CacheKey::compute("hello", "bob", "alice");
        assert_ne!(ab, ba);
    }

    #[test]
    fn display_is_short_prefix() {
        let key = CacheKey::compute("x", "a", "b");
        assert_eq!(key.to_string().len(), 12);
    }
}

//! Commit identity.
//!
//! A change is identified by its commit hash, unique across a stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commit hash wrapper with display formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    /// Create a new CommitId.
    pub fn new(hash: impl Into<String>) -> Self {
        CommitId(hash.into())
    }

    /// Borrow the underlying hash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated hash for log lines (first 12 characters).
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        CommitId(s.to_string())
    }
}

impl From<String> for CommitId {
    fn from(s: String) -> Self {
        CommitId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_id_short() {
        let id = CommitId::new("0123456789abcdef0123");
        assert_eq!(id.short(), "0123456789ab");
        assert_eq!(CommitId::new("abc").short(), "abc");
    }

    #[test]
    fn test_commit_id_serializes_transparent() {
        let id = CommitId::from("deadbeef");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""deadbeef""#);
        let back: CommitId = serde_json::from_str(r#""deadbeef""#).unwrap();
        assert_eq!(back, id);
    }
}

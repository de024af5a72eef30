//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Market index identifier (e.g. `VNINDEX`, `VN30`) - newtype for type safety.
///
/// Identifiers are normalised to upper case so that `VNIndex` from one
/// upstream endpoint and `VNINDEX` from another refer to the same index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexId(String);

impl IndexId {
    /// Create a new `IndexId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_uppercase())
    }

    /// Get the index ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IndexId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for IndexId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Downstream subscriber identifier, unique within one relay process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(u64);

impl SubscriberId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_id_is_case_insensitive() {
        assert_eq!(IndexId::from("HNXIndex"), IndexId::from("HNXINDEX"));
        assert_eq!(IndexId::from(" vn30 ").as_str(), "VN30");
    }

    #[test]
    fn subscriber_id_display() {
        assert_eq!(SubscriberId::new(7).to_string(), "sub-7");
    }
}

//! Common types used throughout SiteCanvas.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    /// Create a new SiteId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "SiteId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_id_creation() {
        let id = SiteId::new("acme-plumbing").unwrap();
        assert_eq!(id.as_str(), "acme-plumbing");
        assert_eq!(id.to_string(), "acme-plumbing");
    }

    #[test]
    fn test_site_id_empty_fails() {
        assert!(SiteId::new("").is_err());
    }

    #[test]
    fn test_site_id_serializes_transparent() {
        let id = SiteId::new("acme").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""acme""#);
    }
}

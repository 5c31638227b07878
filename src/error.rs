//! Error types for hivemap.

use thiserror::Error;

/// The main error type for mapping-to-SQL generation.
#[derive(Debug, Error)]
pub enum HivemapError {
    /// A source path the analyzer cannot classify: more than one flattening
    /// marker, a map-key marker with a trailing remainder, or syntax the
    /// grammar rejects.
    #[error("Malformed path '{path}': {message}")]
    MalformedPath { path: String, message: String },

    /// A type enumerant outside the supported closed set.
    #[error("Invalid mapping type: '{0}'. Expected: string, int, boolean, timestamp, or date")]
    InvalidType(String),

    /// No mapping rules matched the requested target table.
    #[error("No mapping rules for target table '{0}'")]
    NoRulesForTable(String),
}

impl HivemapError {
    /// Create a malformed-path error for the given path.
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for hivemap operations.
pub type HivemapResult<T> = Result<T, HivemapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HivemapError::malformed("$.a[*].b[*]", "more than one flattening marker");
        assert_eq!(
            err.to_string(),
            "Malformed path '$.a[*].b[*]': more than one flattening marker"
        );
    }

    #[test]
    fn test_no_rules_display() {
        let err = HivemapError::NoRulesForTable("claimant".into());
        assert_eq!(
            err.to_string(),
            "No mapping rules for target table 'claimant'"
        );
    }
}

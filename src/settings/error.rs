use thiserror::Error;

/// Errors raised while reading values out of a settings tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LookupError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("type mismatch for '{key}': expected a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("cannot convert '{key}' = {raw:?} to {target}")]
    Conversion {
        key: String,
        raw: String,
        target: &'static str,
    },
}

impl LookupError {
    pub(crate) fn not_found(key: &str) -> Self {
        LookupError::NotFound(key.to_string())
    }

    pub(crate) fn expected_leaf(key: &str) -> Self {
        LookupError::TypeMismatch {
            key: key.to_string(),
            expected: "value",
        }
    }

    pub(crate) fn expected_group(key: &str) -> Self {
        LookupError::TypeMismatch {
            key: key.to_string(),
            expected: "group",
        }
    }

    /// Returns `true` for absence, the only failure the no-raise accessors swallow.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }
}

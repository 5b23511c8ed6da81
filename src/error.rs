//! Error types shared by the codec, compiler, projector and merger.

use thiserror::Error;

/// The two error families callers distinguish between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced path or key was absent when presence was required.
    Key,
    /// Conflicting directives, malformed input or a failed conversion.
    Value,
}

/// Errors raised by document operations.
#[derive(Debug, Error)]
pub enum DocError {
    /// A required key or path is missing.
    #[error("missing key `{0}`")]
    MissingKey(String),

    /// A field spec token could not be parsed.
    #[error("invalid field spec token `{token}`: {reason}")]
    InvalidSpec { token: String, reason: String },

    /// Two directives that cannot be combined were supplied together.
    #[error("conflicting directives: {0}")]
    ConflictingDirectives(String),

    /// Flat paths disagree about the shape of the document they describe.
    #[error("structural conflict at `{path}`: {reason}")]
    StructuralConflict { path: String, reason: String },

    /// A transform pipeline step failed for a key.
    #[error("transform `{step}` failed for key `{path}`: {cause}")]
    Transform {
        path: String,
        step: String,
        cause: String,
    },

    /// A value had a different type than an operation required.
    #[error("`{path}` must be {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Set-deduplication hit a value that has no identity without a set key.
    #[error("items in `{0}` list are not hashable, missing the set key?")]
    Unhashable(String),

    /// Validation performed by `has` failed.
    #[error("{0}")]
    Validation(String),

    /// The root of a document must be a mapping.
    #[error("document root must be an object, got {0}")]
    NotADocument(&'static str),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocError::MissingKey(_) => ErrorKind::Key,
            _ => ErrorKind::Value,
        }
    }

    pub(crate) fn spec(token: &str, reason: impl Into<String>) -> Self {
        DocError::InvalidSpec {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn structural(path: &str, reason: impl Into<String>) -> Self {
        DocError::StructuralConflict {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// Decides how errors leave an [`Extractor`](crate::Extractor) or
/// [`Merger`](crate::Merger).
///
/// Every error an operation is about to return passes through [`raise`],
/// which may rewrite it (for instance to report every failure as a
/// validation error). Failures suppressed by a `safe` or `safe_none`
/// pipeline are reported through [`swallowed`] instead.
///
/// [`raise`]: ErrorPolicy::raise
/// [`swallowed`]: ErrorPolicy::swallowed
pub trait ErrorPolicy {
    fn raise(&self, err: DocError) -> DocError {
        err
    }

    fn swallowed(&self, path: &str, step: &str, err: &DocError) {
        tracing::warn!(path, step, error = %err, "transform failure suppressed");
    }
}

/// Returns every error unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPolicy;

impl ErrorPolicy for StrictPolicy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DocError::MissingKey("a".into()).kind(), ErrorKind::Key);
        assert_eq!(DocError::spec("-", "empty path").kind(), ErrorKind::Value);
        assert_eq!(DocError::Unhashable("a".into()).kind(), ErrorKind::Value);
    }

    #[test]
    fn test_messages_name_the_key() {
        let err = DocError::Transform {
            path: "a.b".into(),
            step: "int".into(),
            cause: "invalid digit".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.b"));
        assert!(msg.contains("int"));
        assert!(msg.contains("invalid digit"));
    }
}

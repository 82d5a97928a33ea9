//! Error types for filter encoding and decoding.

use thiserror::Error;

/// Filter codec errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A model node or operator has no representation in the target revision.
    #[error("Unsupported filter construct for {version}: {construct}")]
    UnsupportedFilterConstruct { version: String, construct: String },

    /// Neither or both operands of a spatial predicate are property references.
    #[error("Ambiguous operands for spatial operator {operator}: {reason}")]
    AmbiguousSpatialOperand { operator: String, reason: String },

    /// Required child/attribute absent, unknown element kind, or bad identifier shape.
    #[error("Malformed filter document: {0}")]
    MalformedFilterDocument(String),

    /// A qualified property reference whose prefix has no namespace mapping.
    #[error("Unresolved namespace prefix '{prefix}' in property '{path}'")]
    UnresolvedNamespacePrefix { prefix: String, path: String },

    /// Version token outside the supported revisions.
    #[error("Unsupported filter encoding version: {0}")]
    UnsupportedVersion(String),

    /// The horizontal axes of an envelope could not be located.
    #[error("CRS lookup failure: {0}")]
    CrsLookupFailure(String),

    /// A model value that violates its own invariants (e.g. empty id set).
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// XML text could not be read or written.
    #[error("XML error: {0}")]
    Xml(String),
}

impl FilterError {
    pub(crate) fn unsupported(version: impl ToString, construct: impl Into<String>) -> Self {
        FilterError::UnsupportedFilterConstruct {
            version: version.to_string(),
            construct: construct.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        FilterError::MalformedFilterDocument(message.into())
    }

    pub(crate) fn ambiguous(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::AmbiguousSpatialOperand {
            operator: operator.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, FilterError>;

//! Result and error types for Treeprobe.
//!
//! "Not found" is never an error here: find operations return `Ok(None)` or an
//! empty `Vec`. The variants below cover stale nodes, violated preconditions,
//! indeterminate geometry and provider failures.

use thiserror::Error;

/// Result type for Treeprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in Treeprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A lazy handle could not be resolved to a node
    #[error("Element not found: {element}")]
    ElementNotFound {
        /// Description of the handle (its search strategy)
        element: String,
    },

    /// The node is no longer part of the tree
    #[error("Element not available: {element}")]
    ElementNotAvailable {
        /// Description of the stale node
        element: String,
    },

    /// The element is disabled
    #[error("{reason}: element is not enabled ({element})")]
    ElementNotEnabled {
        /// Machine-readable reason, e.g. `NOT SCROLL`
        reason: String,
        /// Description of the element
        element: String,
    },

    /// A required control pattern is missing
    #[error("{reason}: {pattern} is not supported ({element})")]
    PatternNotSupported {
        /// Machine-readable reason
        reason: String,
        /// Pattern name
        pattern: String,
        /// Description of the element
        element: String,
    },

    /// An operation precondition does not hold
    #[error("{reason}: {message}")]
    Precondition {
        /// Machine-readable reason
        reason: String,
        /// Human-readable detail
        message: String,
    },

    /// A condition could not be built
    #[error("Invalid condition: {message}")]
    InvalidCondition {
        /// Error message
        message: String,
    },

    /// A path expression could not be parsed or evaluated
    #[error("Invalid path expression '{expression}': {message}")]
    InvalidPath {
        /// The expression text
        expression: String,
        /// Error message
        message: String,
    },

    /// An argument is out of its domain
    #[error("{reason}: {message}")]
    InvalidArgument {
        /// Machine-readable reason
        reason: String,
        /// Human-readable detail
        message: String,
    },

    /// A handle was constructed without a node and without a (parent, strategy) pair
    #[error("Invalid element handle: {message}")]
    InvalidHandle {
        /// Error message
        message: String,
    },

    /// A location could not be computed for an element
    #[error("Could not determine location of {element}: {cause}")]
    GeometryIndeterminate {
        /// Description of the element
        element: String,
        /// Underlying cause
        cause: String,
    },

    /// The provider does not expose this property on the node
    #[error("Property {property} is not supported by {element}")]
    PropertyNotSupported {
        /// Property name
        property: String,
        /// Description of the node
        element: String,
    },

    /// A property value had an unexpected type
    #[error("GET PROPERTY VALUE FAILED: {property} is {actual}, expected {expected}")]
    PropertyType {
        /// Property name
        property: String,
        /// Expected type name
        expected: &'static str,
        /// Actual value rendered
        actual: String,
    },

    /// Text could not be read through any text strategy
    #[error("NO GET TEXT: {element}")]
    TextUnavailable {
        /// Description of the element
        element: String,
    },

    /// Any other provider failure
    #[error("Provider error: {message}")]
    Provider {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Short machine-readable reason for this error
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::ElementNotFound { .. } => "ELEMENT NOT FOUND",
            Self::ElementNotAvailable { .. } => "ELEMENT NOT AVAILABLE",
            Self::ElementNotEnabled { reason, .. }
            | Self::PatternNotSupported { reason, .. }
            | Self::Precondition { reason, .. }
            | Self::InvalidArgument { reason, .. } => reason,
            Self::InvalidCondition { .. } => "INVALID CONDITION",
            Self::InvalidPath { .. } => "INVALID PATH",
            Self::InvalidHandle { .. } => "INVALID HANDLE",
            Self::GeometryIndeterminate { .. } => "LOCATION UNKNOWN",
            Self::PropertyNotSupported { .. } => "PROPERTY NOT SUPPORTED",
            Self::PropertyType { .. } => "GET PROPERTY VALUE FAILED",
            Self::TextUnavailable { .. } => "NO GET TEXT",
            Self::Provider { .. } => "PROVIDER ERROR",
            Self::Io(_) => "IO ERROR",
            Self::Yaml(_) | Self::Json(_) => "CONFIG ERROR",
        }
    }

    /// True when the node behind a handle went away
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::ElementNotAvailable { .. }
        )
    }

    pub(crate) fn not_available(element: impl Into<String>) -> Self {
        Self::ElementNotAvailable {
            element: element.into(),
        }
    }

    pub(crate) fn precondition(reason: &str, message: impl Into<String>) -> Self {
        Self::Precondition {
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

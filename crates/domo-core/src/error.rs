//! Error types for identifier validation.

use thiserror::Error;

/// Errors raised when constructing or parsing an identifier.
///
/// Validation happens at construction time: an identifier that would violate
/// its invariants is rejected here and never comes into existence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required identifier component is empty
    #[error("{component} must not be empty")]
    EmptyComponent { component: &'static str },

    /// An identifier component contains the reserved `:` separator
    #[error("{component} must not contain ':': {value:?}")]
    ReservedSeparator {
        component: &'static str,
        value: String,
    },

    /// A serialized identifier does not match the expected shape
    #[error("malformed identifier {value:?}: expected {expected}")]
    Malformed {
        value: String,
        expected: &'static str,
    },
}

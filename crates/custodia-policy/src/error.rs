//! Error types for rule storage and evaluation

use thiserror::Error;

/// Rule store and evaluation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A rule with this id already exists in the store
    #[error("Duplicate rule id: {id}")]
    DuplicateRule { id: String },

    /// No rule with this id exists in the store
    #[error("Rule not found: {id}")]
    RuleNotFound { id: String },

    /// The rule definition failed validation at insert time
    #[error("Invalid rule '{id}': {reason}")]
    InvalidRule { id: String, reason: String },
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;

//! Error types for the ability engine

use crate::types::{Action, SubjectType, UserId};
use thiserror::Error;

/// Ability engine errors
#[derive(Debug, Error)]
pub enum AbacError {
    /// The user does not exist in the permission store
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The permission store could not be read
    #[error("Permission store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored permission record carries an unknown action or subject
    #[error("Malformed permission record: {0}")]
    MalformedPermission(String),

    /// A conditions template could not be resolved for the user
    #[error("Unresolvable condition: {0}")]
    UnresolvableCondition(String),

    /// A domain value could not be turned into a subject object
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    /// The ability does not grant the requested action
    #[error("Forbidden: cannot {action} {subject}")]
    Forbidden {
        action: Action,
        subject: SubjectType,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AbacError {
    /// Whether this error is a permission denial.
    ///
    /// Every other variant is a failure of the decision engine itself and must
    /// be surfaced as such, never read as an implicit allow or deny.
    pub fn is_denial(&self) -> bool {
        matches!(self, AbacError::Forbidden { .. })
    }
}

/// Result type for ability engine operations
pub type Result<T> = std::result::Result<T, AbacError>;

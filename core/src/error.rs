//! Error taxonomy for the scheduling core.
//!
//! Five domain error kinds plus a storage escape hatch. Every kind is
//! terminal for the triggering request: the core never retries on behalf of
//! the caller (the one internally absorbed condition is the conditional
//! slot claim in booking creation, which surfaces as [`CoreError::Conflict`]
//! after a single re-read).

use thiserror::Error;

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the scheduling core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed input: bad time range, missing required field, bad score.
    #[error("{0}")]
    Validation(String),

    /// Overlapping slot or double-booking attempt.
    #[error("{0}")]
    Conflict(String),

    /// The actor lacks rights over the resource.
    #[error("{0}")]
    Forbidden(String),

    /// A referenced slot, booking, or tutor does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of the missing resource ("slot", "booking", "tutor").
        resource: &'static str,
        /// Identifier that failed to resolve.
        id: String,
    },

    /// Operation invalid for the current lifecycle state, e.g. editing a
    /// booked slot, re-rating, or leaving a terminal status.
    #[error("{0}")]
    InvalidState(String),

    /// A store adapter failed. Carries adapter detail for logging; never
    /// shown verbatim to end users.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Build a [`CoreError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a [`CoreError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Build a [`CoreError::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Build a [`CoreError::NotFound`] for a resource kind and id.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Build a [`CoreError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Build a [`CoreError::Storage`].
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = CoreError::not_found("slot", "abc-123");
        assert_eq!(err.to_string(), "slot abc-123 not found");
    }

    #[test]
    fn test_storage_display() {
        let err = CoreError::storage("connection reset");
        assert_eq!(err.to_string(), "storage error: connection reset");
    }
}

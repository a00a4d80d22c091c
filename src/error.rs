//! Error types for the attendance analytics engine.

use thiserror::Error;

use crate::alerts::AlertState;

/// Errors produced by the analytics engine.
///
/// Sparse data is never an error: missing records produce empty bucket lists
/// and zeroed summaries. Only malformed input and illegal alert transitions
/// surface here.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// A caller-supplied value could not be interpreted.
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// A persisted alert was asked to move out of a state that forbids it.
    #[error("cannot {action} an alert in state {from}")]
    InvalidTransition { from: AlertState, action: &'static str },

    /// The injected notifier rejected a breach notification.
    #[error(transparent)]
    Notifier(#[from] anyhow::Error),
}

impl AttendanceError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AttendanceError::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, AttendanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_names_the_field() {
        let err = AttendanceError::invalid_argument("start", "not a calendar date: 2025-13-01");
        let msg = err.to_string();
        assert!(msg.contains("`start`"));
        assert!(msg.contains("2025-13-01"));
    }

    #[test]
    fn invalid_transition_names_state_and_action() {
        let err = AttendanceError::InvalidTransition {
            from: AlertState::Resolved,
            action: "dismiss",
        };
        assert_eq!(err.to_string(), "cannot dismiss an alert in state RESOLVED");
    }
}

use crate::domain::booking::{BookingId, BookingStatus};
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum BookingError {
    #[error("{0} not found")]
    #[diagnostic(code(washbay::not_found))]
    NotFound(String),

    #[error("forbidden: {0}")]
    #[diagnostic(code(washbay::forbidden))]
    Forbidden(String),

    #[error("cannot move booking from {from} to {to} (allowed: {next})", next = display_allowed(.allowed))]
    #[diagnostic(code(washbay::invalid_transition))]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
        allowed: Vec<BookingStatus>,
    },

    #[error("validation failed: {0}")]
    #[diagnostic(code(washbay::validation_failed))]
    ValidationFailed(String),

    #[error("payment provider failed: {reason}")]
    #[diagnostic(
        code(washbay::provider_failure),
        help("the booking is kept; retry payment initiation against the same booking id")
    )]
    ProviderFailure {
        booking: Option<BookingId>,
        reason: String,
    },

    #[error("payment provider timed out after {after:?}")]
    #[diagnostic(code(washbay::provider_timeout))]
    ProviderTimeout {
        booking: Option<BookingId>,
        after: Duration,
    },

    #[error("conflict: {0}")]
    #[diagnostic(code(washbay::conflict))]
    Conflict(String),

    #[error("session token has been revoked")]
    #[diagnostic(code(washbay::unauthenticated))]
    Unauthenticated,

    #[error("Internal error: {0}")]
    #[diagnostic(code(washbay::internal))]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    /// Stable tag for the routing layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ValidationFailed(_) => "validation_failed",
            Self::ProviderFailure { .. } => "provider_failure",
            Self::ProviderTimeout { .. } => "provider_timeout",
            Self::Conflict(_) => "conflict",
            Self::Unauthenticated => "unauthenticated",
            Self::Internal(_) => "internal",
        }
    }

    /// The booking that was committed before the failure, if any.
    pub fn booking_id(&self) -> Option<BookingId> {
        match self {
            Self::ProviderFailure { booking, .. } | Self::ProviderTimeout { booking, .. } => {
                *booking
            }
            _ => None,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<std::io::Error> for BookingError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for BookingError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

fn display_allowed(allowed: &[BookingStatus]) -> String {
    if allowed.is_empty() {
        return "none".to_string();
    }
    allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_lists_allowed_states() {
        let err = BookingError::InvalidTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::StartService,
            allowed: vec![BookingStatus::Confirmed, BookingStatus::Cancelled],
        };
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(
            err.to_string(),
            "cannot move booking from pending to startservice (allowed: confirmed, cancelled)"
        );
    }

    #[test]
    fn test_terminal_state_reports_no_allowed_moves() {
        let err = BookingError::InvalidTransition {
            from: BookingStatus::Complete,
            to: BookingStatus::Cancelled,
            allowed: vec![],
        };
        assert!(err.to_string().ends_with("(allowed: none)"));
    }

    #[test]
    fn test_provider_failure_carries_booking_id() {
        let id = BookingId::new();
        let err = BookingError::ProviderFailure {
            booking: Some(id),
            reason: "card declined".to_string(),
        };
        assert_eq!(err.booking_id(), Some(id));
        assert_eq!(err.kind(), "provider_failure");
        assert!(BookingError::Unauthenticated.booking_id().is_none());
    }
}

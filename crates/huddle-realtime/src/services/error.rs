//! Fan-out core error types
//!
//! Presence and typing are best-effort: callers log these errors, they never reach
//! an end user. Subscription denial is its own detail-free type so nothing about
//! the target entity can leak through it.

use huddle_cache::StoreError;
use huddle_common::AppError;
use huddle_core::DomainError;

/// Error from a broadcaster publish call
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// Channel name outside the known families, or an event sent to the wrong family
    #[error("Malformed broadcast channel: {0}")]
    MalformedChannel(String),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Subscription rejected by the channel gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Subscription denied")]
pub struct AuthorizationDenied;

/// Error type for tracker and context operations
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// Ephemeral store could not complete a write
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),

    /// Context assembled without a required dependency
    #[error("Missing dependency: {0}")]
    MissingDependency(&'static str),
}

impl RealtimeError {
    /// Whether the ephemeral store was unreachable
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unavailable())
    }
}

impl From<RealtimeError> for AppError {
    fn from(err: RealtimeError) -> Self {
        match err {
            RealtimeError::Domain(e) => AppError::Domain(e),
            RealtimeError::Store(e) => AppError::Cache(e.to_string()),
            RealtimeError::Broadcast(e) => AppError::Broadcast(e.to_string()),
            other => AppError::internal(other),
        }
    }
}

/// Result type for tracker and context operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_has_no_detail() {
        assert_eq!(AuthorizationDenied.to_string(), "Subscription denied");
    }

    #[test]
    fn test_store_unavailable_classification() {
        let err = RealtimeError::from(StoreError::Unavailable);
        assert!(err.is_store_unavailable());

        let err = RealtimeError::MissingDependency("store");
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_convert_to_app_error() {
        let err: AppError = RealtimeError::from(StoreError::Unavailable).into();
        assert!(matches!(err, AppError::Cache(_)));

        let err: AppError = RealtimeError::Broadcast(BroadcastError::MalformedChannel(
            "presence-foo".to_string(),
        ))
        .into();
        assert_eq!(err.error_code(), "BROADCAST_REJECTED");
    }
}

//! Error types for the voting service
//!
//! Core components return the typed [`ArenaError`] so callers can match on
//! the failure kind at the request boundary. Outer layers (configuration,
//! service bootstrap) wrap these in `anyhow` like the rest of the binary.

use std::time::Duration;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Failure kinds surfaced by the rating core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArenaError {
    #[error("Not enough entities to form a pair in category '{category}': {available} available")]
    InsufficientPool { category: String, available: usize },

    #[error("Invalid vote: {reason}")]
    InvalidVote { reason: String },

    #[error("Vote limit reached, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Entity {entity_id} was modified concurrently")]
    ConcurrentModification { entity_id: String },

    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl ArenaError {
    /// Stable snake_case code used in API bodies and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            ArenaError::InsufficientPool { .. } => "insufficient_pool",
            ArenaError::InvalidVote { .. } => "invalid_vote",
            ArenaError::RateLimited { .. } => "rate_limited",
            ArenaError::StoreUnavailable { .. } => "store_unavailable",
            ArenaError::ConcurrentModification { .. } => "concurrent_modification",
            ArenaError::InvalidRecord { .. } => "invalid_record",
            ArenaError::ConfigurationError { .. } => "configuration_error",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// Validation failures are deterministic and never retryable. A rate
    /// limit clears on its own, so the caller is told when to come back
    /// through the retry hint instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArenaError::StoreUnavailable { .. })
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        ArenaError::StoreUnavailable {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_vote(reason: impl Into<String>) -> Self {
        ArenaError::InvalidVote {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_record(reason: impl Into<String>) -> Self {
        ArenaError::InvalidRecord {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        let err = ArenaError::InsufficientPool {
            category: "female".to_string(),
            available: 1,
        };
        assert_eq!(err.kind(), "insufficient_pool");
        assert_eq!(ArenaError::invalid_vote("self vote").kind(), "invalid_vote");
        assert_eq!(ArenaError::store("down").kind(), "store_unavailable");
    }

    #[test]
    fn test_only_store_failures_are_retryable() {
        assert!(ArenaError::store("timeout").is_retryable());
        assert!(!ArenaError::invalid_vote("unknown entity").is_retryable());
        assert!(!ArenaError::RateLimited {
            retry_after: Duration::from_secs(60)
        }
        .is_retryable());
    }

    #[test]
    fn test_rate_limited_message_includes_seconds() {
        let err = ArenaError::RateLimited {
            retry_after: Duration::from_secs(43_200),
        };
        assert_eq!(err.to_string(), "Vote limit reached, retry after 43200s");
    }
}

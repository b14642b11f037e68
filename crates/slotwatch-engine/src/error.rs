use thiserror::Error;

use slotwatch_storage::StorageError;

/// Convenience result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the polling and subscription engine.
///
/// Upstream probe failures never surface here: the prober is fail-closed
/// and resolves them to "no slots". Per-token delivery failures are
/// classified outcomes, not errors, and provider-level dispatch failures
/// stay inside their service group as `PushError`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Upstream request failed: {message}")]
    Upstream { message: String },

    #[error("Store read failed")]
    StoreRead {
        #[source]
        source: StorageError,
    },

    #[error("Store commit failed")]
    Commit {
        #[source]
        source: StorageError,
    },
}

impl EngineError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn subscription_not_found(id: impl Into<String>) -> Self {
        Self::SubscriptionNotFound(id.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn store_read(source: StorageError) -> Self {
        Self::StoreRead { source }
    }

    pub fn commit(source: StorageError) -> Self {
        Self::Commit { source }
    }

    /// Whether the caller did something wrong (4xx category).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::SubscriptionNotFound(_)
        )
    }
}

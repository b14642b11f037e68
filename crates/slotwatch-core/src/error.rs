use thiserror::Error;

/// Core error types for slotwatch operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CoreError {
    /// Create a new InvalidTopic error
    pub fn invalid_topic(topic: impl Into<String>) -> Self {
        Self::InvalidTopic(topic.into())
    }

    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidTopic(_) | Self::InvalidArgument { .. })
    }
}

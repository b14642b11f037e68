use thiserror::Error;

/// Provider-level push failures.
///
/// These cover the send call itself failing; per-token delivery errors are
/// not errors here, they are classified outcomes.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push provider rejected credentials: {0}")]
    Auth(String),

    #[error("Push provider unreachable: {0}")]
    Network(String),

    #[error("Push provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl PushError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Whether retrying on a later tick can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::InvalidResponse(_))
    }
}

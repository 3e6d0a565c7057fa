use thiserror::Error;

/// The one failure text shown to users, whatever went wrong underneath.
pub const GENERATION_FAILED_MESSAGE: &str = "生成失败，请稍后重试。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorCategory {
    UserActionRequired,
    TemporaryFailure,
    InternalFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("provider authentication failed")]
    Auth,
    #[error("provider rate limit reached")]
    RateLimited,
    #[error("provider request timed out")]
    Timeout,
    #[error("provider blocked the request: {reason}")]
    Blocked { reason: String },
    #[error("provider returned an invalid response: {message}")]
    InvalidResponse { message: String },
    #[error("provider transport failed: {message}")]
    Transport { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl GenerationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn category(&self) -> GenerationErrorCategory {
        match self {
            Self::Validation { .. } | Self::Auth | Self::Blocked { .. } => {
                GenerationErrorCategory::UserActionRequired
            }
            Self::RateLimited | Self::Timeout | Self::Transport { .. } => {
                GenerationErrorCategory::TemporaryFailure
            }
            Self::InvalidResponse { .. } | Self::Internal { .. } => {
                GenerationErrorCategory::InternalFailure
            }
        }
    }

    /// Whether a manual retry has a reasonable chance of succeeding. Nothing
    /// retries automatically; this only feeds diagnostics.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::Transport { .. }
        )
    }

    pub fn user_message(&self) -> String {
        GENERATION_FAILED_MESSAGE.to_string()
    }

    pub fn diagnostic_message(&self) -> String {
        format!(
            "{self} (category={:?}, retryable={})",
            self.category(),
            self.is_retryable()
        )
    }
}

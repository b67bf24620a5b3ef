//! Errors shared by the external collaborator ports.

/// Failure of a call to an external collaborator (backend API).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// Call exceeded its bounded timeout.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Credentials rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Non-success HTTP status.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// Body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CollaboratorError {
    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Timeout { .. } | CollaboratorError::Network(_) => true,
            CollaboratorError::Status { status, .. } => *status >= 500 || *status == 429,
            CollaboratorError::Unauthorized | CollaboratorError::InvalidResponse(_) => false,
        }
    }
}

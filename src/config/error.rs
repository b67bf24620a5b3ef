//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Session lock TTL must be between 100ms and 30s")]
    InvalidLockTtl,

    #[error("Session lock retry settings must be non-zero")]
    InvalidLockRetry,

    #[error("Invalid backend URL format")]
    InvalidBackendUrl,

    #[error("Session TTL '{0}' must be non-zero")]
    InvalidSessionTtl(&'static str),

    #[error("Lesson TTL must be at least one hour")]
    LessonTtlTooShort,

    #[error("Webhook secret is required in production")]
    WebhookSecretRequired,
}

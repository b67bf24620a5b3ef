//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `FLUENTLY` prefix and
//! nested values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use fluently_bot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod backend;
mod error;
mod redis;
mod server;
mod session;

pub use backend::BackendConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Webhook server (host, port, environment, secret)
    #[serde(default)]
    pub server: ServerConfig,

    /// Session store connection and lock tuning
    pub redis: RedisConfig,

    /// Backend API used for lessons, progress and account linking
    pub backend: BackendConfig,

    /// Expiry of session entries
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `FLUENTLY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `FLUENTLY__REDIS__URL=...` -> `redis.url = ...`
    /// - `FLUENTLY__SESSION__LESSON_TTL_SECS=86400` -> `session.lesson_ttl_secs`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FLUENTLY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.redis.validate()?;
        self.backend.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("FLUENTLY__REDIS__URL", "redis://localhost:6379");
        env::set_var("FLUENTLY__BACKEND__BASE_URL", "https://api.fluently.test");
    }

    fn clear_env() {
        for key in [
            "FLUENTLY__REDIS__URL",
            "FLUENTLY__BACKEND__BASE_URL",
            "FLUENTLY__SERVER__PORT",
            "FLUENTLY__SERVER__ENVIRONMENT",
            "FLUENTLY__SERVER__WEBHOOK_SECRET",
            "FLUENTLY__SESSION__LESSON_TTL_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.backend.base_url, "https://api.fluently.test");
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_validate_minimal_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_session_ttl_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("FLUENTLY__SESSION__LESSON_TTL_SECS", "7200");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.session.lesson_ttl_secs, 7200);
        assert_eq!(config.session.temp_ttl_secs, 24 * 60 * 60);
    }

    #[test]
    fn test_production_without_secret_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("FLUENTLY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::WebhookSecretRequired)
        );
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("FLUENTLY__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(result.unwrap().server.port, 3000);
    }
}

//! Redis configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_LOCK_TTL_MS: u64 = 30_000;
const MIN_LOCK_TTL_MS: u64 = 100;

/// Redis configuration (session store)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Expiry of the per-user lesson lock, in milliseconds
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_ms: u64,

    /// Pause between lock attempts, in milliseconds
    #[serde(default = "default_lock_retry")]
    pub lock_retry_ms: u64,

    /// Lock attempts before giving up
    #[serde(default = "default_lock_attempts")]
    pub lock_max_attempts: u32,
}

impl RedisConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    pub fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if !(MIN_LOCK_TTL_MS..=MAX_LOCK_TTL_MS).contains(&self.lock_ttl_ms) {
            return Err(ValidationError::InvalidLockTtl);
        }
        if self.lock_retry_ms == 0 || self.lock_max_attempts == 0 {
            return Err(ValidationError::InvalidLockRetry);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_timeout(),
            lock_ttl_ms: default_lock_ttl(),
            lock_retry_ms: default_lock_retry(),
            lock_max_attempts: default_lock_attempts(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}

fn default_lock_ttl() -> u64 {
    5_000
}

fn default_lock_retry() -> u64 {
    50
}

fn default_lock_attempts() -> u32 {
    40
}

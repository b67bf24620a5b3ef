//! Backend API configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Backend API configuration (lesson generation, progress, linking)
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.fluently.example`
    pub base_url: String,

    /// Bound on every collaborator call, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Service key sent on unauthenticated calls (account linking)
    pub api_key: Option<String>,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("BACKEND_BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBackendUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout(),
            api_key: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

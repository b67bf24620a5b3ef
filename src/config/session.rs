//! Session entry lifetimes

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Expiry of each kind of session entry, in seconds
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default = "default_state_ttl")]
    pub state_ttl_secs: u64,

    #[serde(default = "default_lesson_ttl")]
    pub lesson_ttl_secs: u64,

    #[serde(default = "default_temp_ttl")]
    pub temp_ttl_secs: u64,

    #[serde(default = "default_link_ttl")]
    pub link_ttl_secs: u64,

    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_secs: u64,
}

impl SessionConfig {
    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }

    pub fn lesson_ttl(&self) -> Duration {
        Duration::from_secs(self.lesson_ttl_secs)
    }

    pub fn temp_ttl(&self) -> Duration {
        Duration::from_secs(self.temp_ttl_secs)
    }

    pub fn link_ttl(&self) -> Duration {
        Duration::from_secs(self.link_ttl_secs)
    }

    pub fn jwt_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let ttls = [
            ("state_ttl_secs", self.state_ttl_secs),
            ("lesson_ttl_secs", self.lesson_ttl_secs),
            ("temp_ttl_secs", self.temp_ttl_secs),
            ("link_ttl_secs", self.link_ttl_secs),
            ("jwt_ttl_secs", self.jwt_ttl_secs),
        ];
        if let Some((name, _)) = ttls.iter().find(|(_, secs)| *secs == 0) {
            return Err(ValidationError::InvalidSessionTtl(name));
        }
        // A lesson must outlive a normal sitting.
        if self.lesson_ttl_secs < HOUR {
            return Err(ValidationError::LessonTtlTooShort);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: default_state_ttl(),
            lesson_ttl_secs: default_lesson_ttl(),
            temp_ttl_secs: default_temp_ttl(),
            link_ttl_secs: default_link_ttl(),
            jwt_ttl_secs: default_jwt_ttl(),
        }
    }
}

fn default_state_ttl() -> u64 {
    30 * DAY
}

fn default_lesson_ttl() -> u64 {
    DAY
}

fn default_temp_ttl() -> u64 {
    DAY
}

fn default_link_ttl() -> u64 {
    HOUR
}

fn default_jwt_ttl() -> u64 {
    7 * DAY
}

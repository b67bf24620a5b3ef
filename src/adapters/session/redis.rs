//! Redis-backed session store for production deployments.
//!
//! Every entry is a JSON (or plain string) value with its own expiry.
//! Lesson progress updates run under a per-user lock:
//! 1. `SET lock token NX PX ttl` until acquired or attempts run out
//! 2. GET, mutate, SET with the lesson TTL
//! 3. release with a compare-and-delete script so a lock that expired and
//!    was re-acquired by another request is never deleted

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{RedisConfig, SessionConfig};
use crate::domain::foundation::UserId;
use crate::domain::fsm::UserState;
use crate::domain::lesson::LessonProgress;
use crate::ports::{LessonMutator, LinkToken, SessionStore, SessionStoreError};

use super::keys;

const RELEASE_LOCK: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Tuning for the per-user lesson lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    pub ttl: Duration,
    pub retry: Duration,
    pub max_attempts: u32,
}

impl From<&RedisConfig> for LockSettings {
    fn from(config: &RedisConfig) -> Self {
        Self {
            ttl: config.lock_ttl(),
            retry: config.lock_retry(),
            max_attempts: config.lock_max_attempts,
        }
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            retry: Duration::from_millis(50),
            max_attempts: 40,
        }
    }
}

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttls: SessionConfig,
    lock: LockSettings,
}

fn unavailable(e: redis::RedisError) -> SessionStoreError {
    SessionStoreError::Unavailable(e.to_string())
}

impl RedisSessionStore {
    pub fn new(conn: MultiplexedConnection, ttls: SessionConfig, lock: LockSettings) -> Self {
        Self { conn, ttls, lock }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(unavailable)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionStoreError> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(unavailable)
    }

    async fn acquire_lock(&self, user: &UserId) -> Result<String, SessionStoreError> {
        let key = keys::lock_key(user);
        let token = Uuid::new_v4().to_string();
        let ttl_ms = self.lock.ttl.as_millis() as u64;
        let mut conn = self.conn.clone();

        for _ in 0..self.lock.max_attempts {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;
            if acquired.is_some() {
                return Ok(token);
            }
            tokio::time::sleep(self.lock.retry).await;
        }

        tracing::warn!(user_id = %user, "session lock not acquired");
        Err(SessionStoreError::LockTimeout(user.clone()))
    }

    async fn release_lock(&self, user: &UserId, token: &str) {
        let mut conn = self.conn.clone();
        let released: Result<i32, _> = redis::Script::new(RELEASE_LOCK)
            .key(keys::lock_key(user))
            .arg(token)
            .invoke_async(&mut conn)
            .await;
        match released {
            Ok(0) => tracing::warn!(user_id = %user, "session lock expired before release"),
            Ok(_) => {}
            Err(e) => tracing::warn!(user_id = %user, error = %e, "session lock release failed"),
        }
    }

    async fn update_locked(
        &self,
        user: &UserId,
        mutator: LessonMutator<'_>,
    ) -> Result<LessonProgress, SessionStoreError> {
        let key = keys::lesson_key(user);
        let mut progress: LessonProgress = self
            .get_json(&key)
            .await?
            .ok_or(SessionStoreError::NoActiveLesson)?;

        mutator(&mut progress).map_err(SessionStoreError::Rejected)?;

        let encoded = serde_json::to_string(&progress)?;
        self.set_with_ttl(&key, &encoded, self.ttls.lesson_ttl()).await?;
        Ok(progress)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get_state(&self, user: &UserId) -> Result<UserState, SessionStoreError> {
        Ok(self
            .get_raw(&keys::state_key(user))
            .await?
            .map(|raw| UserState::from_stored(&raw))
            .unwrap_or_default())
    }

    async fn set_state(&self, user: &UserId, state: UserState) -> Result<(), SessionStoreError> {
        self.set_with_ttl(&keys::state_key(user), state.as_str(), self.ttls.state_ttl())
            .await
    }

    async fn get_lesson_progress(
        &self,
        user: &UserId,
    ) -> Result<Option<LessonProgress>, SessionStoreError> {
        self.get_json(&keys::lesson_key(user)).await
    }

    async fn store_lesson_progress(
        &self,
        user: &UserId,
        progress: &LessonProgress,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let encoded = serde_json::to_string(progress)?;
        self.set_with_ttl(&keys::lesson_key(user), &encoded, ttl).await
    }

    async fn clear_lesson_progress(&self, user: &UserId) -> Result<(), SessionStoreError> {
        self.delete(&keys::lesson_key(user)).await
    }

    async fn update_lesson_progress(
        &self,
        user: &UserId,
        mutator: LessonMutator<'_>,
    ) -> Result<LessonProgress, SessionStoreError> {
        let token = self.acquire_lock(user).await?;
        let result = self.update_locked(user, mutator).await;
        self.release_lock(user, &token).await;
        result
    }

    async fn get_temp_data(
        &self,
        user: &UserId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, SessionStoreError> {
        self.get_json(&keys::temp_key(user, key)).await
    }

    async fn store_temp_data(
        &self,
        user: &UserId,
        key: &str,
        value: &serde_json::Value,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let encoded = serde_json::to_string(value)?;
        self.set_with_ttl(&keys::temp_key(user, key), &encoded, ttl).await
    }

    async fn clear_temp_data(&self, user: &UserId, key: &str) -> Result<(), SessionStoreError> {
        self.delete(&keys::temp_key(user, key)).await
    }

    async fn get_jwt_token(&self, user: &UserId) -> Result<Option<SecretString>, SessionStoreError> {
        Ok(self
            .get_raw(&keys::jwt_key(user))
            .await?
            .filter(|token| !token.is_empty())
            .map(SecretString::new))
    }

    async fn store_jwt_token(
        &self,
        user: &UserId,
        token: &SecretString,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.set_with_ttl(&keys::jwt_key(user), token.expose_secret(), ttl)
            .await
    }

    async fn store_user_linking_data(
        &self,
        user: &UserId,
        link: &LinkToken,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let encoded = serde_json::to_string(link)?;
        self.set_with_ttl(&keys::link_key(user), &encoded, ttl).await
    }

    async fn get_user_linking_data(
        &self,
        user: &UserId,
    ) -> Result<Option<LinkToken>, SessionStoreError> {
        self.get_json(&keys::link_key(user)).await
    }
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("ttls", &self.ttls)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

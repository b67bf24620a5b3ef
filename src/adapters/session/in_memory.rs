//! In-memory session store for testing and development.
//!
//! Entries live in one map guarded by a tokio `Mutex`; the lock is held
//! across the whole read-modify-write of `update_lesson_progress`, which
//! makes it atomic per process. Expiry is checked on read.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::domain::foundation::UserId;
use crate::domain::fsm::UserState;
use crate::domain::lesson::LessonProgress;
use crate::ports::{LessonMutator, LinkToken, SessionStore, SessionStoreError};

use super::keys;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttls: SessionConfig,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySessionStore {
    pub fn new(ttls: SessionConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttls,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every subsequent call fail with `Unavailable` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live entries, expired ones excluded.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), SessionStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SessionStoreError::Unavailable("store offline".into()));
        }
        Ok(())
    }

    async fn put(&self, key: String, value: String, ttl: Duration) -> Result<(), SessionStoreError> {
        self.check_available()?;
        let expires_at = Instant::now() + ttl;
        self.entries
            .lock()
            .await
            .insert(key, Entry { value, expires_at });
        Ok(())
    }

    async fn put_json<T: Serialize + ?Sized>(
        &self,
        key: String,
        value: &T,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let encoded = serde_json::to_string(value)?;
        self.put(key, encoded, ttl).await
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionStoreError> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        self.check_available()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_state(&self, user: &UserId) -> Result<UserState, SessionStoreError> {
        Ok(self
            .get_raw(&keys::state_key(user))
            .await?
            .map(|raw| UserState::from_stored(&raw))
            .unwrap_or_default())
    }

    async fn set_state(&self, user: &UserId, state: UserState) -> Result<(), SessionStoreError> {
        self.put(
            keys::state_key(user),
            state.as_str().to_string(),
            self.ttls.state_ttl(),
        )
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
        self.put_json(keys::lesson_key(user), progress, ttl).await
    }

    async fn clear_lesson_progress(&self, user: &UserId) -> Result<(), SessionStoreError> {
        self.delete(&keys::lesson_key(user)).await
    }

    async fn update_lesson_progress(
        &self,
        user: &UserId,
        mutator: LessonMutator<'_>,
    ) -> Result<LessonProgress, SessionStoreError> {
        self.check_available()?;
        let key = keys::lesson_key(user);
        let mut entries = self.entries.lock().await;

        let now = Instant::now();
        let raw = match entries.get(&key) {
            Some(entry) if entry.expires_at > now => entry.value.clone(),
            _ => return Err(SessionStoreError::NoActiveLesson),
        };
        let mut progress: LessonProgress = serde_json::from_str(&raw)?;

        mutator(&mut progress).map_err(SessionStoreError::Rejected)?;

        let value = serde_json::to_string(&progress)?;
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttls.lesson_ttl(),
            },
        );
        Ok(progress)
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
        self.put_json(keys::temp_key(user, key), value, ttl).await
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
        self.put(keys::jwt_key(user), token.expose_secret().clone(), ttl)
            .await
    }

    async fn store_user_linking_data(
        &self,
        user: &UserId,
        link: &LinkToken,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.put_json(keys::link_key(user), link, ttl).await
    }

    async fn get_user_linking_data(
        &self,
        user: &UserId,
    ) -> Result<Option<LinkToken>, SessionStoreError> {
        self.get_json(&keys::link_key(user)).await
    }
}

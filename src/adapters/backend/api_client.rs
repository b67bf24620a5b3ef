//! Backend API client - implements every collaborator port over HTTP.
//!
//! # Endpoints
//!
//! | Port | Method | Path |
//! |------|--------|------|
//! | `LessonGenerator` | GET | `/api/v1/lesson` |
//! | `ProgressReporter` | POST | `/api/v1/progress` |
//! | `AccountLinker::create_link` | POST | `/telegram/create-link` |
//! | `AccountLinker::check_link` | POST | `/telegram/check-status` |
//! | `PreferencesClient::update_preferences` | PUT | `/api/v1/preferences` |
//! | `PreferencesClient::list_topics` | GET | `/api/v1/topics` |
//!
//! Learner calls carry the learner's JWT as a bearer token. Linking calls
//! carry the optional service key instead.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::BackendConfig;
use crate::domain::foundation::UserId;
use crate::domain::lesson::{LessonResponse, WordProgress};
use crate::domain::onboarding::UserPreferences;
use crate::ports::{
    AccountLinker, CollaboratorError, LessonGenerator, LinkStatus, LinkToken, PreferencesClient,
    ProgressReporter,
};

const USER_AGENT: &str = "fluently-bot/1.0";

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    api_key: Option<Secret<String>>,
}

impl BackendClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            api_key: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(api_key.into()));
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret().as_str())
    }
}

impl From<&BackendConfig> for BackendClientConfig {
    fn from(config: &BackendConfig) -> Self {
        let client_config = Self::new(config.base_url.clone()).with_timeout(config.timeout());
        match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => client_config.with_api_key(key),
            _ => client_config,
        }
    }
}

#[derive(Debug, Serialize)]
struct LinkRequest {
    telegram_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckStatusResponse {
    is_linked: bool,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProgressItem<'a> {
    word_id: &'a str,
    learned_at: String,
    confidence_score: u8,
    cnt_reviewed: u32,
}

#[derive(Debug, Serialize)]
struct PreferencesRequest<'a> {
    cefr_level: &'a str,
    words_per_day: u8,
    notifications: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    goal: Option<&'a str>,
}

impl<'a> PreferencesRequest<'a> {
    fn new(preferences: &'a UserPreferences, goal: Option<&'a str>) -> Self {
        Self {
            cefr_level: preferences.cefr_level.as_str(),
            words_per_day: preferences.words_per_day,
            notifications: preferences.notifications_enabled,
            notification_at: preferences
                .notification_time
                .as_deref()
                .filter(|_| preferences.notifications_enabled)
                .map(notification_at),
            goal,
        }
    }
}

/// The backend stores the reminder as a timestamp; only its clock time is read.
fn notification_at(time: &str) -> String {
    format!("0001-01-01T{}:00Z", time)
}

#[derive(Debug, Deserialize)]
struct TopicItem {
    title: String,
}

/// Backend identifies chat users by numeric id when the id is numeric.
fn telegram_id(user: &UserId) -> serde_json::Value {
    user.as_str()
        .parse::<i64>()
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::from(user.as_str()))
}

/// HTTP implementation of the collaborator ports.
pub struct BackendApiClient {
    config: BackendClientConfig,
    client: Client,
}

impl BackendApiClient {
    pub fn new(config: BackendClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn with_service_key(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_key() {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, CollaboratorError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::timeout(self.config.timeout.as_secs())
            } else if e.is_connect() {
                CollaboratorError::network(format!("Connection failed: {}", e))
            } else {
                CollaboratorError::network(e.to_string())
            }
        })?;
        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(CollaboratorError::Unauthorized),
            code => Err(CollaboratorError::status(code, body)),
        }
    }

    async fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<T, CollaboratorError> {
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::timeout(self.config.timeout.as_secs())
            } else {
                CollaboratorError::invalid_response(format!("Failed to parse response: {}", e))
            }
        })
    }
}

#[async_trait]
impl LessonGenerator for BackendApiClient {
    async fn generate_lesson(&self, token: &SecretString) -> Result<LessonResponse, CollaboratorError> {
        let request = self
            .client
            .get(self.url("/api/v1/lesson"))
            .bearer_auth(token.expose_secret());
        let response = self.send(request).await?;
        let lesson: LessonResponse = self.parse(response).await?;

        if lesson.cards.is_empty() {
            return Err(CollaboratorError::invalid_response("lesson has no cards"));
        }
        tracing::debug!(
            cards = lesson.cards.len(),
            words_per_lesson = lesson.lesson.words_per_lesson,
            "lesson generated"
        );
        Ok(lesson)
    }
}

#[async_trait]
impl ProgressReporter for BackendApiClient {
    async fn send_lesson_progress(
        &self,
        token: &SecretString,
        progress: &[WordProgress],
    ) -> Result<(), CollaboratorError> {
        if progress.is_empty() {
            return Ok(());
        }
        let body: Vec<ProgressItem<'_>> = progress
            .iter()
            .map(|p| ProgressItem {
                word_id: p.word_id.as_str(),
                learned_at: p.learned_at.to_rfc3339(),
                confidence_score: p.confidence_score,
                cnt_reviewed: p.cnt_reviewed,
            })
            .collect();

        let request = self
            .client
            .post(self.url("/api/v1/progress"))
            .bearer_auth(token.expose_secret())
            .json(&body);
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountLinker for BackendApiClient {
    async fn create_link(&self, user: &UserId) -> Result<LinkToken, CollaboratorError> {
        let request = self.with_service_key(
            self.client
                .post(self.url("/telegram/create-link"))
                .json(&LinkRequest {
                    telegram_id: telegram_id(user),
                }),
        );
        let response = self.send(request).await?;
        let link: LinkToken = self.parse(response).await?;
        if link.link_url.is_empty() {
            return Err(CollaboratorError::invalid_response("empty link url"));
        }
        Ok(link)
    }

    async fn check_link(&self, user: &UserId) -> Result<LinkStatus, CollaboratorError> {
        let request = self.with_service_key(
            self.client
                .post(self.url("/telegram/check-status"))
                .json(&LinkRequest {
                    telegram_id: telegram_id(user),
                }),
        );
        let response = self.send(request).await?;
        let status: CheckStatusResponse = self.parse(response).await?;
        tracing::debug!(user_id = %user, is_linked = status.is_linked, "checked link status");

        Ok(LinkStatus {
            is_linked: status.is_linked,
            jwt_token: status
                .token
                .filter(|token| !token.is_empty())
                .map(SecretString::new),
        })
    }
}

#[async_trait]
impl PreferencesClient for BackendApiClient {
    async fn update_preferences(
        &self,
        token: &SecretString,
        preferences: &UserPreferences,
        goal: Option<&str>,
    ) -> Result<(), CollaboratorError> {
        let body = PreferencesRequest::new(preferences, goal);
        let request = self
            .client
            .put(self.url("/api/v1/preferences"))
            .bearer_auth(token.expose_secret())
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn list_topics(&self, token: &SecretString) -> Result<Vec<String>, CollaboratorError> {
        let request = self
            .client
            .get(self.url("/api/v1/topics"))
            .bearer_auth(token.expose_secret());
        let response = self.send(request).await?;
        let items: Option<Vec<TopicItem>> = self.parse(response).await?;
        Ok(unique_titles(items.unwrap_or_default()))
    }
}

fn unique_titles(items: Vec<TopicItem>) -> Vec<String> {
    let mut titles: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !item.title.is_empty() && !titles.contains(&item.title) {
            titles.push(item.title);
        }
    }
    titles
}

impl std::fmt::Debug for BackendApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendApiClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

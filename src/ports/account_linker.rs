//! Account linking and preference sync ports.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;
use crate::domain::onboarding::UserPreferences;

use super::CollaboratorError;

/// Pending link between a chat user and a backend account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkToken {
    pub token: String,
    pub link_url: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Result of polling a pending link.
#[derive(Debug, Clone)]
pub struct LinkStatus {
    pub is_linked: bool,
    /// Backend token issued once the link completes.
    pub jwt_token: Option<SecretString>,
}

/// Port for linking a chat identity to a backend account.
#[async_trait]
pub trait AccountLinker: Send + Sync {
    async fn create_link(&self, user: &UserId) -> Result<LinkToken, CollaboratorError>;

    async fn check_link(&self, user: &UserId) -> Result<LinkStatus, CollaboratorError>;
}

/// Port for saving learner preferences to the backend.
#[async_trait]
pub trait PreferencesClient: Send + Sync {
    async fn update_preferences(
        &self,
        token: &SecretString,
        preferences: &UserPreferences,
        goal: Option<&str>,
    ) -> Result<(), CollaboratorError>;

    /// Titles of the goal topics a learner can pick, without duplicates.
    async fn list_topics(&self, token: &SecretString) -> Result<Vec<String>, CollaboratorError>;
}

//! Settings: words per day, CEFR level, reminders and the learning goal.
//!
//! Preferences live in temp data under the state TTL and are pushed to the
//! backend whenever the learner has a linked account. A failed push is
//! logged and the local copy kept.
//!
//! The goal picker lists topics fetched from the backend once per visit,
//! five per page; the fetched list is kept in temp data while paging.

use tracing::{debug, info, warn};

use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::fsm::UserState;
use crate::domain::lesson::CefrLevel;
use crate::domain::onboarding::{Question, TopicSelection, UserPreferences};
use crate::ports::{CollaboratorError, SessionStoreError};

use super::{
    screens, temp_keys, via_start, FlowResult, LessonOrchestrator, OrchestratorError,
    SettingsField,
};

fn field_state(field: SettingsField) -> UserState {
    match field {
        SettingsField::WordsPerDay => UserState::SettingsWordsPerDay,
        SettingsField::CefrLevel => UserState::SettingsCefrLevel,
        SettingsField::Notifications => UserState::SettingsNotifications,
        SettingsField::NotificationTime => UserState::SettingsNotificationTime,
        SettingsField::Topic => UserState::SettingsTopicSelection,
    }
}

impl LessonOrchestrator {
    /// `/settings`.
    pub(super) async fn open_settings(&self, user: &UserId, state: UserState) -> FlowResult {
        self.move_along(user, state, &via_start(state, &[UserState::Settings]))
            .await?;
        Ok(screens::settings(&self.preferences(user).await?))
    }

    pub(super) async fn edit_setting(
        &self,
        user: &UserId,
        state: UserState,
        field: SettingsField,
    ) -> FlowResult {
        if field == SettingsField::Topic {
            return self.open_topics(user, state).await;
        }

        let target = field_state(field);
        let path = if state == target { vec![] } else { vec![target] };
        self.move_along(user, state, &path).await?;

        let preferences = self.preferences(user).await?;
        Ok(match field {
            SettingsField::WordsPerDay => screens::words_per_day_options(preferences.words_per_day),
            SettingsField::CefrLevel => screens::level_options(preferences.cefr_level),
            SettingsField::Notifications => screens::notification_options(&preferences),
            SettingsField::NotificationTime => screens::notification_time_input(),
            SettingsField::Topic => screens::settings(&preferences),
        })
    }

    pub(super) async fn set_words_per_day(&self, user: &UserId, state: UserState, words: u8) -> FlowResult {
        self.change_setting(user, state, SettingsField::WordsPerDay, |prefs| {
            prefs.set_words_per_day(words).map_err(Into::into)
        })
        .await
    }

    pub(super) async fn set_level(&self, user: &UserId, state: UserState, level: CefrLevel) -> FlowResult {
        self.change_setting(user, state, SettingsField::CefrLevel, |prefs| {
            prefs.cefr_level = level;
            Ok(())
        })
        .await
    }

    pub(super) async fn set_notifications(
        &self,
        user: &UserId,
        state: UserState,
        enabled: bool,
    ) -> FlowResult {
        self.change_setting(user, state, SettingsField::Notifications, |prefs| {
            if enabled {
                prefs.notifications_enabled = true;
            } else {
                prefs.disable_notifications();
            }
            Ok(())
        })
        .await
    }

    /// Preset reminder time picked on the notifications screen.
    pub(super) async fn set_notification_time(
        &self,
        user: &UserId,
        state: UserState,
        time: &str,
    ) -> FlowResult {
        self.change_setting(user, state, SettingsField::Notifications, |prefs| {
            prefs.set_notification_time(time).map_err(Into::into)
        })
        .await
    }

    /// Reminder time typed after "Enter a time".
    pub(super) async fn type_notification_time(
        &self,
        user: &UserId,
        state: UserState,
        text: &str,
    ) -> FlowResult {
        let result = self
            .change_setting(user, state, SettingsField::NotificationTime, |prefs| {
                prefs.set_notification_time(text).map_err(Into::into)
            })
            .await;
        match result {
            Err(OrchestratorError::Validation(err)) => {
                debug!(user_id = %user, error = %err, "unreadable reminder time");
                Ok(screens::notification_time_input()
                    .with_note("⚠️ I couldn't read that time. Try something like 9:30 or 21:00."))
            }
            other => other,
        }
    }

    /// Fetches the goal topics and shows their first page.
    async fn open_topics(&self, user: &UserId, state: UserState) -> FlowResult {
        if !matches!(state, UserState::Settings | UserState::SettingsTopicSelection) {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::SettingsTopicSelection,
            });
        }
        let Some(token) = self.jwt(user).await? else {
            return self.start_linking(user, state).await;
        };

        let topics = match self
            .bounded(self.collaborators.preferences.list_topics(&token))
            .await
        {
            Ok(topics) => topics,
            Err(CollaboratorError::Unauthorized) => {
                warn!(user_id = %user, "backend rejected token, relinking");
                return self.start_linking(user, state).await;
            }
            Err(err) => return Err(err.into()),
        };

        let selection = TopicSelection::new(topics);
        self.store_temp_value(user, temp_keys::TOPICS, &selection, self.ttls.state_ttl())
            .await?;
        let path = if state == UserState::SettingsTopicSelection {
            vec![]
        } else {
            vec![UserState::SettingsTopicSelection]
        };
        self.move_along(user, state, &path).await?;
        Ok(screens::topic_page(&selection))
    }

    pub(super) async fn show_topic_page(
        &self,
        user: &UserId,
        state: UserState,
        page: usize,
    ) -> FlowResult {
        let mut selection = self.topic_selection(user, state).await?;
        if !selection.has_page(page) {
            return Err(ValidationError::out_of_range(
                "topic_page",
                1,
                selection.page_count() as i32,
                page as i32 + 1,
            )
            .into());
        }
        selection.page = page;
        self.store_temp_value(user, temp_keys::TOPICS, &selection, self.ttls.state_ttl())
            .await?;
        Ok(screens::topic_page(&selection))
    }

    pub(super) async fn set_topic(&self, user: &UserId, state: UserState, index: usize) -> FlowResult {
        let selection = self.topic_selection(user, state).await?;
        let topic = selection
            .get(index)
            .ok_or_else(|| {
                ValidationError::out_of_range(
                    "topic",
                    1,
                    selection.topics.len() as i32,
                    index as i32 + 1,
                )
            })?
            .to_string();

        let prompt = self
            .change_setting(user, state, SettingsField::Topic, |prefs| {
                prefs.goal_topic = Some(topic.clone());
                Ok(())
            })
            .await?;
        self.store.clear_temp_data(user, temp_keys::TOPICS).await?;
        info!(user_id = %user, topic = %topic, "learning goal changed");
        Ok(prompt)
    }

    /// Topic list of the open picker; only valid on the picker screen.
    async fn topic_selection(
        &self,
        user: &UserId,
        state: UserState,
    ) -> Result<TopicSelection, OrchestratorError> {
        if state != UserState::SettingsTopicSelection {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::SettingsTopicSelection,
            });
        }
        Ok(self
            .temp_value(user, temp_keys::TOPICS)
            .await?
            .unwrap_or_default())
    }

    pub(super) async fn settings_back(&self, user: &UserId, state: UserState) -> FlowResult {
        let path = if state == UserState::Settings {
            vec![]
        } else {
            vec![UserState::Settings]
        };
        self.move_along(user, state, &path).await?;
        Ok(screens::settings(&self.preferences(user).await?))
    }

    async fn change_setting<F>(
        &self,
        user: &UserId,
        state: UserState,
        field: SettingsField,
        apply: F,
    ) -> FlowResult
    where
        F: FnOnce(&mut UserPreferences) -> Result<(), OrchestratorError>,
    {
        if state != field_state(field) {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::Settings,
            });
        }
        let mut preferences = self.preferences(user).await?;
        apply(&mut preferences)?;
        self.save_preferences(user, &preferences).await?;
        self.move_along(user, state, &[UserState::Settings]).await?;
        Ok(screens::settings(&preferences).with_note("✅ Saved"))
    }

    /// Stores preferences locally and pushes them when an account is linked.
    pub(super) async fn save_preferences(
        &self,
        user: &UserId,
        preferences: &UserPreferences,
    ) -> Result<(), SessionStoreError> {
        self.store_temp_value(user, temp_keys::PREFERENCES, preferences, self.ttls.state_ttl())
            .await?;

        let Some(token) = self.jwt(user).await? else {
            return Ok(());
        };
        let goal: Option<String> = match &preferences.goal_topic {
            Some(topic) => Some(topic.clone()),
            None => self.temp_value(user, &Question::Goal.temp_key()).await?,
        };
        if let Err(err) = self
            .bounded(self.collaborators.preferences.update_preferences(
                &token,
                preferences,
                goal.as_deref(),
            ))
            .await
        {
            warn!(user_id = %user, error = %err, "preference sync failed");
        }
        Ok(())
    }
}

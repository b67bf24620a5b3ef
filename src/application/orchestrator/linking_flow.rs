//! Account linking for learners without a backend token.

use tracing::info;

use crate::domain::foundation::UserId;
use crate::domain::fsm::UserState;

use super::{
    check_path, screens, temp_keys, via_start, FlowResult, LessonOrchestrator, OrchestratorError,
};

impl LessonOrchestrator {
    /// Creates a link and waits for the learner to complete it.
    pub(super) async fn start_linking(&self, user: &UserId, state: UserState) -> FlowResult {
        let path = via_start(
            state,
            &[UserState::AccountLinking, UserState::WaitingForLink],
        );
        check_path(state, &path)?;

        let link = self
            .bounded(self.collaborators.linker.create_link(user))
            .await?;
        self.store
            .store_user_linking_data(user, &link, self.ttls.link_ttl())
            .await?;
        self.move_along(user, state, &path).await?;

        info!(user_id = %user, "account link created");
        Ok(screens::link_prompt(Some(&link)))
    }

    pub(super) async fn new_link(&self, user: &UserId, state: UserState) -> FlowResult {
        if !matches!(state, UserState::AccountLinking | UserState::WaitingForLink) {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::AccountLinking,
            });
        }
        self.start_linking(user, state).await
    }

    /// Polls the pending link; stores the issued token once it completes.
    pub(super) async fn check_link(&self, user: &UserId, state: UserState) -> FlowResult {
        if state != UserState::WaitingForLink {
            return Err(OrchestratorError::InvalidTransition {
                from: state,
                to: UserState::AccountLinked,
            });
        }

        let status = self
            .bounded(self.collaborators.linker.check_link(user))
            .await?;
        let token = match status.jwt_token {
            Some(token) if status.is_linked => token,
            _ => {
                let link = self.store.get_user_linking_data(user).await?;
                return Ok(screens::link_prompt(link.as_ref())
                    .with_note("⏳ Not linked yet. Open the link, then press the button again."));
            }
        };

        self.store
            .store_jwt_token(user, &token, self.ttls.jwt_ttl())
            .await?;
        self.move_along(user, state, &[UserState::AccountLinked])
            .await?;
        info!(user_id = %user, "account linked");

        if self
            .store
            .get_temp_data(user, temp_keys::PREFERENCES)
            .await?
            .is_some()
        {
            let preferences = self.preferences(user).await?;
            self.save_preferences(user, &preferences).await?;
        }

        Ok(screens::account_linked())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use crate::ports::SessionStore;
    use super::super::{ButtonAction, Command};
    use super::*;
    use crate::domain::lesson::test_support::lesson;
    use crate::ports::CollaboratorError;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn link_completes_and_stores_token() {
        let h = Harness::new(lesson(3, 3));
        let prompt = h.command(Command::Learn).await;
        assert!(prompt.text.contains("https://fluently.test/link/link-42"));
        assert_eq!(h.state().await, UserState::WaitingForLink);

        let prompt = h.press(ButtonAction::LinkCheck).await;
        assert!(prompt.text.starts_with("⏳"));
        assert_eq!(h.state().await, UserState::WaitingForLink);

        h.backend.complete_link("issued").await;
        let prompt = h.press(ButtonAction::LinkCheck).await;
        assert!(prompt.has_action(&ButtonAction::LessonNew));
        assert_eq!(h.state().await, UserState::AccountLinked);

        let token = h.store.get_jwt_token(&h.user).await.unwrap().unwrap();
        assert_eq!(token.expose_secret(), "issued");

        h.press(ButtonAction::LessonNew).await;
        assert_eq!(h.state().await, UserState::LessonInProgress);
        assert_eq!(h.backend.tokens_seen().await, vec!["issued".to_string()]);
    }

    #[tokio::test]
    async fn new_link_replaces_pending_one() {
        let h = Harness::new(lesson(3, 3));
        h.command(Command::Learn).await;
        h.press(ButtonAction::LinkNew).await;
        assert_eq!(h.state().await, UserState::WaitingForLink);
        assert_eq!(h.backend.links_created().await.len(), 2);
    }

    #[tokio::test]
    async fn linker_failure_keeps_state() {
        let h = Harness::new(lesson(3, 3));
        h.backend
            .fail_links_with(Some(CollaboratorError::network("refused")))
            .await;
        let prompt = h.command(Command::Learn).await;
        assert!(prompt.has_action(&ButtonAction::Run(Command::Learn)));
        assert_eq!(h.state().await, UserState::Start);
    }

    #[tokio::test]
    async fn check_outside_waiting_is_rejected() {
        let h = Harness::new(lesson(3, 3));
        h.backend.complete_link("issued").await;
        h.press(ButtonAction::LinkCheck).await;
        assert!(h.store.get_jwt_token(&h.user).await.unwrap().is_none());
    }
}

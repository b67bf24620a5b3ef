//! Onboarding questionnaire.

use crate::domain::fsm::UserState;
use crate::domain::foundation::ValidationError;

/// One questionnaire question, asked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    Goal,
    Confidence,
    Habits,
    Experience,
}

impl Question {
    pub const ALL: [Question; 4] = [
        Question::Goal,
        Question::Confidence,
        Question::Habits,
        Question::Experience,
    ];

    /// Field name in button actions and temp-data keys.
    pub fn field(&self) -> &'static str {
        match self {
            Question::Goal => "goal",
            Question::Confidence => "confidence",
            Question::Habits => "words_per_day",
            Question::Experience => "experience",
        }
    }

    pub fn from_field(field: &str) -> Option<Question> {
        Question::ALL.iter().copied().find(|q| q.field() == field)
    }

    /// Temp-data key holding the answer.
    pub fn temp_key(&self) -> String {
        format!("questionnaire:{}", self.field())
    }

    pub fn state(&self) -> UserState {
        match self {
            Question::Goal => UserState::QuestionGoal,
            Question::Confidence => UserState::QuestionConfidence,
            Question::Habits => UserState::QuestionHabits,
            Question::Experience => UserState::QuestionExperience,
        }
    }

    pub fn for_state(state: UserState) -> Option<Question> {
        Question::ALL.iter().copied().find(|q| q.state() == state)
    }

    pub fn next(&self) -> Option<Question> {
        match self {
            Question::Goal => Some(Question::Confidence),
            Question::Confidence => Some(Question::Habits),
            Question::Habits => Some(Question::Experience),
            Question::Experience => None,
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Question::Goal => "🎯 Why are you learning English?",
            Question::Confidence => "💪 How would you rate your English today?",
            Question::Habits => "📅 How many new words would you like to learn per day?",
            Question::Experience => "⏳ How long have you been learning English?",
        }
    }

    /// (label, value) pairs offered as buttons.
    pub fn options(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Question::Goal => &[
                ("Work / career", "work"),
                ("Travel", "travel"),
                ("Education", "education"),
                ("Communication", "communication"),
            ],
            Question::Confidence => &[
                ("Beginner", "beginner"),
                ("Elementary", "elementary"),
                ("Intermediate", "intermediate"),
                ("Advanced", "advanced"),
            ],
            Question::Habits => &[
                ("5 words", "5"),
                ("10 words (recommended)", "10"),
                ("15 words", "15"),
                ("20 words", "20"),
            ],
            Question::Experience => &[
                ("Just starting", "beginner"),
                ("Less than a year", "less_year"),
                ("1-3 years", "1_3_years"),
                ("More than 3 years", "more_3_years"),
            ],
        }
    }

    /// Checks that `value` is one of the offered options.
    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        if self.options().iter().any(|(_, v)| *v == value) {
            Ok(())
        } else {
            Err(ValidationError::invalid_format(
                self.field(),
                format!("unexpected answer '{}'", value),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_chain_in_order() {
        let mut q = Question::Goal;
        let mut seen = vec![q];
        while let Some(next) = q.next() {
            seen.push(next);
            q = next;
        }
        assert_eq!(seen, Question::ALL.to_vec());
    }

    #[test]
    fn state_mapping_roundtrips() {
        for q in Question::ALL {
            assert_eq!(Question::for_state(q.state()), Some(q));
            assert_eq!(Question::from_field(q.field()), Some(q));
        }
        assert_eq!(Question::for_state(UserState::Start), None);
    }

    #[test]
    fn validate_accepts_only_offered_values() {
        assert!(Question::Habits.validate("15").is_ok());
        assert!(Question::Habits.validate("12").is_err());
        assert!(Question::Goal.validate("travel").is_ok());
    }

    #[test]
    fn temp_key_is_namespaced() {
        assert_eq!(Question::Goal.temp_key(), "questionnaire:goal");
    }
}

//! UserState catalogue: every place a learner can be in the conversation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Conversational state of a single learner.
///
/// Persisted by its wire name (see [`UserState::as_str`]); a learner with no
/// stored state is at [`UserState::Start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    // Onboarding
    #[default]
    Start,
    Welcome,
    MethodExplanation,
    SpacedRepetition,

    // Questionnaire
    Questionnaire,
    QuestionGoal,
    QuestionConfidence,
    QuestionHabits,
    QuestionExperience,

    // Vocabulary level test
    VocabularyTest,
    #[serde(rename = "test_group_1")]
    TestGroup1,
    #[serde(rename = "test_group_2")]
    TestGroup2,
    #[serde(rename = "test_group_3")]
    TestGroup3,
    #[serde(rename = "test_group_4")]
    TestGroup4,
    #[serde(rename = "test_group_5")]
    TestGroup5,
    LevelProcessing,
    LevelResult,

    // Lesson flow
    LessonStart,
    LessonInProgress,
    LessonComplete,
    ShowingWordSet,
    #[serde(rename = "showing_word_1")]
    ShowingWord1,
    #[serde(rename = "showing_word_2")]
    ShowingWord2,
    #[serde(rename = "showing_word_3")]
    ShowingWord3,
    ReadyForExercises,
    DoingExercises,
    ExerciseInProgress,
    SetComplete,
    WaitingForTextInput,

    // Settings
    Settings,
    SettingsWordsPerDay,
    SettingsCefrLevel,
    SettingsNotifications,
    #[serde(rename = "settings_time_input")]
    SettingsNotificationTime,
    SettingsTopicSelection,

    // Account linking
    AccountLinking,
    WaitingForLink,
    AccountLinked,

    // Terminal / error
    Error,
    ErrorRecovery,
    Retry,
    Help,
    Cancel,
}

/// Coarse grouping of states, used for routing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Onboarding,
    Questionnaire,
    VocabularyTest,
    Lesson,
    Settings,
    AccountLinking,
    Terminal,
}

impl UserState {
    /// Every state, in declaration order.
    pub const ALL: [UserState; 43] = [
        UserState::Start,
        UserState::Welcome,
        UserState::MethodExplanation,
        UserState::SpacedRepetition,
        UserState::Questionnaire,
        UserState::QuestionGoal,
        UserState::QuestionConfidence,
        UserState::QuestionHabits,
        UserState::QuestionExperience,
        UserState::VocabularyTest,
        UserState::TestGroup1,
        UserState::TestGroup2,
        UserState::TestGroup3,
        UserState::TestGroup4,
        UserState::TestGroup5,
        UserState::LevelProcessing,
        UserState::LevelResult,
        UserState::LessonStart,
        UserState::LessonInProgress,
        UserState::LessonComplete,
        UserState::ShowingWordSet,
        UserState::ShowingWord1,
        UserState::ShowingWord2,
        UserState::ShowingWord3,
        UserState::ReadyForExercises,
        UserState::DoingExercises,
        UserState::ExerciseInProgress,
        UserState::SetComplete,
        UserState::WaitingForTextInput,
        UserState::Settings,
        UserState::SettingsWordsPerDay,
        UserState::SettingsCefrLevel,
        UserState::SettingsNotifications,
        UserState::SettingsNotificationTime,
        UserState::SettingsTopicSelection,
        UserState::AccountLinking,
        UserState::WaitingForLink,
        UserState::AccountLinked,
        UserState::Error,
        UserState::ErrorRecovery,
        UserState::Retry,
        UserState::Help,
        UserState::Cancel,
    ];

    /// Wire name used in the session store.
    pub fn as_str(&self) -> &'static str {
        use UserState::*;
        match self {
            Start => "start",
            Welcome => "welcome",
            MethodExplanation => "method_explanation",
            SpacedRepetition => "spaced_repetition",
            Questionnaire => "questionnaire",
            QuestionGoal => "question_goal",
            QuestionConfidence => "question_confidence",
            QuestionHabits => "question_habits",
            QuestionExperience => "question_experience",
            VocabularyTest => "vocabulary_test",
            TestGroup1 => "test_group_1",
            TestGroup2 => "test_group_2",
            TestGroup3 => "test_group_3",
            TestGroup4 => "test_group_4",
            TestGroup5 => "test_group_5",
            LevelProcessing => "level_processing",
            LevelResult => "level_result",
            LessonStart => "lesson_start",
            LessonInProgress => "lesson_in_progress",
            LessonComplete => "lesson_complete",
            ShowingWordSet => "showing_word_set",
            ShowingWord1 => "showing_word_1",
            ShowingWord2 => "showing_word_2",
            ShowingWord3 => "showing_word_3",
            ReadyForExercises => "ready_for_exercises",
            DoingExercises => "doing_exercises",
            ExerciseInProgress => "exercise_in_progress",
            SetComplete => "set_complete",
            WaitingForTextInput => "waiting_for_text_input",
            Settings => "settings",
            SettingsWordsPerDay => "settings_words_per_day",
            SettingsCefrLevel => "settings_cefr_level",
            SettingsNotifications => "settings_notifications",
            SettingsNotificationTime => "settings_time_input",
            SettingsTopicSelection => "settings_topic_selection",
            AccountLinking => "account_linking",
            WaitingForLink => "waiting_for_link",
            AccountLinked => "account_linked",
            Error => "error",
            ErrorRecovery => "error_recovery",
            Retry => "retry",
            Help => "help",
            Cancel => "cancel",
        }
    }

    /// Parses a stored wire name, falling back to `Start` for names this
    /// build does not know (e.g. written by an older release).
    pub fn from_stored(raw: &str) -> Self {
        match raw.parse() {
            Ok(state) => state,
            Err(_) => {
                tracing::warn!(stored = raw, "unknown stored user state, treating as start");
                UserState::Start
            }
        }
    }

    pub fn phase(&self) -> Phase {
        use UserState::*;
        match self {
            Start | Welcome | MethodExplanation | SpacedRepetition => Phase::Onboarding,
            Questionnaire | QuestionGoal | QuestionConfidence | QuestionHabits
            | QuestionExperience => Phase::Questionnaire,
            VocabularyTest | TestGroup1 | TestGroup2 | TestGroup3 | TestGroup4 | TestGroup5
            | LevelProcessing | LevelResult => Phase::VocabularyTest,
            LessonStart | LessonInProgress | LessonComplete | ShowingWordSet | ShowingWord1
            | ShowingWord2 | ShowingWord3 | ReadyForExercises | DoingExercises
            | ExerciseInProgress | SetComplete | WaitingForTextInput => Phase::Lesson,
            Settings | SettingsWordsPerDay | SettingsCefrLevel | SettingsNotifications
            | SettingsNotificationTime | SettingsTopicSelection => Phase::Settings,
            AccountLinking | WaitingForLink | AccountLinked => Phase::AccountLinking,
            Error | ErrorRecovery | Retry | Help | Cancel => Phase::Terminal,
        }
    }

    /// States `error_recovery` may jump back to.
    pub fn is_main_state(&self) -> bool {
        matches!(
            self,
            UserState::Start
                | UserState::Settings
                | UserState::LessonStart
                | UserState::VocabularyTest
                | UserState::LessonInProgress
        )
    }

    /// True for states reachable from any state.
    pub fn is_escape_target(&self) -> bool {
        matches!(self, UserState::Error | UserState::Help | UserState::Cancel)
    }

    /// True while a lesson is being taught or drilled.
    pub fn is_lesson_state(&self) -> bool {
        self.phase() == Phase::Lesson
    }

    /// True for states where an exercise answer is expected.
    pub fn is_exercise_state(&self) -> bool {
        matches!(
            self,
            UserState::DoingExercises
                | UserState::ExerciseInProgress
                | UserState::WaitingForTextInput
        )
    }

    /// Word-card state for a zero-based slot in the current set.
    pub fn showing_word(index: usize) -> Option<UserState> {
        match index {
            0 => Some(UserState::ShowingWord1),
            1 => Some(UserState::ShowingWord2),
            2 => Some(UserState::ShowingWord3),
            _ => None,
        }
    }

    /// Zero-based slot shown by a word-card state.
    pub fn word_slot(&self) -> Option<usize> {
        match self {
            UserState::ShowingWord1 => Some(0),
            UserState::ShowingWord2 => Some(1),
            UserState::ShowingWord3 => Some(2),
            _ => None,
        }
    }

    /// Test-group state for a one-based group number.
    pub fn test_group(group: u8) -> Option<UserState> {
        match group {
            1 => Some(UserState::TestGroup1),
            2 => Some(UserState::TestGroup2),
            3 => Some(UserState::TestGroup3),
            4 => Some(UserState::TestGroup4),
            5 => Some(UserState::TestGroup5),
            _ => None,
        }
    }

    /// One-based group number of a test-group state.
    pub fn group_number(&self) -> Option<u8> {
        match self {
            UserState::TestGroup1 => Some(1),
            UserState::TestGroup2 => Some(2),
            UserState::TestGroup3 => Some(3),
            UserState::TestGroup4 => Some(4),
            UserState::TestGroup5 => Some(5),
            _ => None,
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("user_state", format!("unknown state '{}'", s)))
    }
}

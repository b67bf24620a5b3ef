//! Static transition table and validation.
//!
//! A transition is valid when the pair is in the table or when one of the
//! two escape rules applies:
//! 1. any state may move to `error`, `help` or `cancel`;
//! 2. `error_recovery` may move to any main entry state.
//!
//! Validation is a pure function of the pair.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use super::UserState;
use crate::domain::foundation::StateMachine;

/// An ordered (from, to) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateTransition {
    pub from: UserState,
    pub to: UserState,
}

impl StateTransition {
    pub const fn new(from: UserState, to: UserState) -> Self {
        Self { from, to }
    }
}

static TRANSITIONS: Lazy<HashSet<StateTransition>> = Lazy::new(|| {
    use UserState::*;

    let pairs: &[(UserState, UserState)] = &[
        // Onboarding
        (Start, Welcome),
        (Welcome, MethodExplanation),
        (MethodExplanation, SpacedRepetition),
        (SpacedRepetition, Questionnaire),
        // Questionnaire
        (Questionnaire, QuestionGoal),
        (QuestionGoal, QuestionConfidence),
        (QuestionConfidence, QuestionHabits),
        (QuestionHabits, QuestionExperience),
        (QuestionExperience, VocabularyTest),
        // Vocabulary test; any group may stop early
        (VocabularyTest, TestGroup1),
        (VocabularyTest, LevelProcessing),
        (TestGroup1, TestGroup2),
        (TestGroup2, TestGroup3),
        (TestGroup3, TestGroup4),
        (TestGroup4, TestGroup5),
        (TestGroup1, LevelProcessing),
        (TestGroup2, LevelProcessing),
        (TestGroup3, LevelProcessing),
        (TestGroup4, LevelProcessing),
        (TestGroup5, LevelProcessing),
        (LevelProcessing, LevelResult),
        (LevelResult, LessonStart),
        (LevelResult, AccountLinking),
        (LevelResult, Start),
        // Main menu
        (Start, AccountLinking),
        (Start, LessonStart),
        (Start, Settings),
        (Start, VocabularyTest),
        // Account linking
        (AccountLinking, WaitingForLink),
        (WaitingForLink, AccountLinked),
        (WaitingForLink, AccountLinking),
        (AccountLinked, Questionnaire),
        (AccountLinked, LessonStart),
        (AccountLinked, Start),
        // Lesson
        (LessonStart, LessonInProgress),
        (LessonInProgress, LessonStart),
        (LessonInProgress, ShowingWordSet),
        (LessonInProgress, DoingExercises),
        (LessonInProgress, LessonComplete),
        (ShowingWordSet, ShowingWord1),
        (ShowingWordSet, LessonComplete),
        (ShowingWord1, ShowingWord2),
        (ShowingWord2, ShowingWord3),
        (ShowingWord2, ShowingWord1),
        (ShowingWord3, ShowingWord2),
        (ShowingWord1, ReadyForExercises),
        (ShowingWord2, ReadyForExercises),
        (ShowingWord3, ReadyForExercises),
        (ShowingWord1, ShowingWordSet),
        (ShowingWord2, ShowingWordSet),
        (ShowingWord3, ShowingWordSet),
        // A set emptied by "already known" words ends without exercises
        (ShowingWord1, SetComplete),
        (ShowingWord2, SetComplete),
        (ShowingWord3, SetComplete),
        (ReadyForExercises, ShowingWord1),
        (ReadyForExercises, DoingExercises),
        (DoingExercises, ExerciseInProgress),
        (DoingExercises, WaitingForTextInput),
        (ExerciseInProgress, WaitingForTextInput),
        (WaitingForTextInput, ExerciseInProgress),
        (ExerciseInProgress, SetComplete),
        (WaitingForTextInput, SetComplete),
        (ExerciseInProgress, LessonComplete),
        (WaitingForTextInput, LessonComplete),
        (ExerciseInProgress, DoingExercises),
        (WaitingForTextInput, DoingExercises),
        (SetComplete, ShowingWordSet),
        (SetComplete, DoingExercises),
        (SetComplete, LessonComplete),
        (LessonComplete, Start),
        (LessonComplete, LessonStart),
        (LessonComplete, Settings),
        // Settings
        (Settings, SettingsWordsPerDay),
        (Settings, SettingsCefrLevel),
        (Settings, SettingsNotifications),
        (SettingsWordsPerDay, Settings),
        (SettingsCefrLevel, Settings),
        (SettingsNotifications, Settings),
        (SettingsNotifications, SettingsNotificationTime),
        (SettingsNotificationTime, Settings),
        (Settings, SettingsTopicSelection),
        (SettingsTopicSelection, Settings),
        (Settings, Start),
        // Error handling
        (Error, Retry),
        (Error, ErrorRecovery),
        (Retry, Start),
        (Help, Start),
        (Cancel, Start),
    ];

    pairs
        .iter()
        .map(|&(from, to)| StateTransition::new(from, to))
        .collect()
});

/// Returns true if `from -> to` is allowed.
///
/// Total over all pairs; unknown pairs are simply false.
pub fn is_valid_transition(from: UserState, to: UserState) -> bool {
    if to.is_escape_target() {
        return true;
    }
    if from == UserState::ErrorRecovery && to.is_main_state() {
        return true;
    }
    TRANSITIONS.contains(&StateTransition::new(from, to))
}

/// Pairs listed in the static table (escape rules excluded).
pub fn table() -> impl Iterator<Item = StateTransition> {
    TRANSITIONS.iter().copied()
}

impl StateMachine for UserState {
    fn can_transition_to(&self, target: &Self) -> bool {
        is_valid_transition(*self, *target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        UserState::ALL
            .iter()
            .copied()
            .filter(|target| is_valid_transition(*self, *target))
            .collect()
    }
}

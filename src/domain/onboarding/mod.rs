//! Onboarding: questionnaire, vocabulary level test, preferences.

mod preferences;
mod questionnaire;
mod topics;

pub use preferences::{
    parse_notification_time, UserPreferences, NOTIFICATION_TIME_PRESETS, WORDS_PER_DAY_OPTIONS,
};
pub use questionnaire::Question;
pub use topics::{TopicSelection, TOPICS_PER_PAGE};
pub use vocab_test::{
    question as test_question, TestAnswer, TestQuestion, TestStep, VocabTestData, GROUP_COUNT,
    QUESTIONS_PER_GROUP,
};

//! Prompt builders, one per screen.

use crate::domain::lesson::{
    hint_for, AnswerMode, Card, CefrLevel, LessonPhase, LessonProgress, LessonStats,
};
use crate::domain::onboarding::{
    Question, TopicSelection, UserPreferences, VocabTestData, NOTIFICATION_TIME_PRESETS,
    WORDS_PER_DAY_OPTIONS,
};
use crate::ports::LinkToken;

use super::events::{ButtonAction, Command, SettingsField};
use super::prompt::{OutboundPrompt, PromptButton};

pub fn main_menu() -> OutboundPrompt {
    OutboundPrompt::new("🏠 Main menu. What would you like to do?")
        .button("📚 Start a lesson", ButtonAction::Run(Command::Learn))
        .button("🧪 Level test", ButtonAction::Run(Command::Test))
        .button("⚙️ Settings", ButtonAction::Run(Command::Settings))
        .button("❓ Help", ButtonAction::Run(Command::Help))
}

pub fn help() -> OutboundPrompt {
    OutboundPrompt::new(
        "❓ Commands:\n\
         /learn - start or resume a lesson\n\
         /test - take the vocabulary level test\n\
         /settings - words per day, level, notifications\n\
         /stats - statistics of the current lesson\n\
         /cancel - leave the current flow (your lesson is kept)\n\
         /help - this message",
    )
    .button("🏠 Main menu", ButtonAction::MainMenu)
}

pub fn cancelled() -> OutboundPrompt {
    main_menu().with_note("👌 Cancelled. Your lesson progress is saved.")
}

pub fn apology(retry: Option<ButtonAction>) -> OutboundPrompt {
    let prompt = OutboundPrompt::new("😔 Sorry, something went wrong on our side. Please try again.");
    match retry {
        Some(action) => prompt.button("🔁 Try again", action),
        None => prompt,
    }
    .button("🏠 Main menu", ButtonAction::MainMenu)
}

pub fn error_state() -> OutboundPrompt {
    OutboundPrompt::new("⚠️ Something interrupted your last action.")
        .button("🏠 Main menu", ButtonAction::MainMenu)
}

pub fn not_available_note() -> &'static str {
    "🤔 That action isn't available right now."
}

// Onboarding

pub fn welcome() -> OutboundPrompt {
    OutboundPrompt::new(
        "👋 Welcome to Fluently! I will help you learn English words a few at a time, \
         every day.",
    )
    .button("Next ➡️", ButtonAction::OnboardingNext)
}

pub fn method_explanation() -> OutboundPrompt {
    OutboundPrompt::new(
        "🧠 How it works: each lesson shows you words in sets of three. \
         You see every word with examples, then practise it in short exercises.",
    )
    .button("Next ➡️", ButtonAction::OnboardingNext)
}

pub fn spaced_repetition() -> OutboundPrompt {
    OutboundPrompt::new(
        "🔁 Words you miss come back at the end of the lesson, and everything you learn \
         is repeated later at growing intervals so it sticks.",
    )
    .button("Next ➡️", ButtonAction::OnboardingNext)
}

pub fn questionnaire_intro() -> OutboundPrompt {
    OutboundPrompt::new("📝 A few quick questions so lessons fit you.")
        .button("Let's go ➡️", ButtonAction::OnboardingNext)
}

pub fn question(question: Question) -> OutboundPrompt {
    question
        .options()
        .iter()
        .fold(OutboundPrompt::new(question.prompt()), |prompt, (label, value)| {
            prompt.button(
                *label,
                ButtonAction::QuestionAnswer {
                    question,
                    value: value.to_string(),
                },
            )
        })
}

// Vocabulary test

pub fn vocab_test_intro() -> OutboundPrompt {
    OutboundPrompt::new(
        "🧪 Let's find your level: 5 short groups of 2 questions, from easy to hard. \
         Pick the right translation or press \"Don't know\".",
    )
    .button("▶️ Start the test", ButtonAction::TestStart)
    .button("⏭ Skip", ButtonAction::TestSkip)
}

pub fn test_question(data: &VocabTestData) -> OutboundPrompt {
    let Some(q) = data.current_question() else {
        return vocab_test_intro();
    };
    let header = format!(
        "Group {}/5 · question {}/2\n\nWhat does \"{}\" mean?",
        data.current_group,
        data.question_index + 1,
        q.word
    );
    q.options
        .iter()
        .enumerate()
        .fold(OutboundPrompt::new(header), |prompt, (i, option)| {
            prompt.button(*option, ButtonAction::TestAnswer(i))
        })
        .button("🤷 Don't know", ButtonAction::TestDontKnow)
}

pub fn early_stop_offer() -> OutboundPrompt {
    OutboundPrompt::new("These seem tricky. Do you want to finish the test here?")
        .button("🏁 Finish the test", ButtonAction::TestStop)
        .button("➡️ Keep going", ButtonAction::TestContinue)
}

pub fn level_result(level: CefrLevel, correct: Option<u32>) -> OutboundPrompt {
    let score = correct
        .map(|c| format!(" ({} of 10 correct)", c))
        .unwrap_or_default();
    OutboundPrompt::new(format!("🎓 Your level: {}{}", level, score))
        .button("📚 Start learning", ButtonAction::LessonNew)
        .button("🏠 Main menu", ButtonAction::MainMenu)
}

// Lesson

pub fn lesson_ready(progress: &LessonProgress) -> OutboundPrompt {
    let level = progress
        .lesson_data
        .lesson
        .cefr_level
        .map(|l| format!(" (level {})", l))
        .unwrap_or_default();
    OutboundPrompt::new(format!(
        "📚 Your lesson is ready: {} new words{}.",
        progress.words_per_lesson(),
        level
    ))
    .button("▶️ Show words", ButtonAction::LessonStartWordSet)
}

pub fn resume_offer(progress: &LessonProgress) -> OutboundPrompt {
    OutboundPrompt::new(format!(
        "📚 You have a lesson in progress: {}/{} words done.",
        progress.drilled_count(),
        progress.words_per_lesson()
    ))
    .button("▶️ Continue", ButtonAction::LessonContinue)
    .button("🔄 Start over", ButtonAction::LessonRestart)
}

pub fn no_active_lesson() -> OutboundPrompt {
    OutboundPrompt::new("📭 You don't have an active lesson.")
        .button("📚 Start a lesson", ButtonAction::LessonNew)
        .button("🏠 Main menu", ButtonAction::MainMenu)
}

pub fn word_set(progress: &LessonProgress) -> OutboundPrompt {
    let mut text = format!("🗂 Set {}. New words:", progress.current_set_index);
    for card in &progress.words_in_current_set {
        text.push_str(&format!("\n• {} - {}", card.word, card.translation));
    }
    OutboundPrompt::new(text).button("👀 Look at each word", ButtonAction::LessonShowWord(0))
}

pub fn word_card(progress: &LessonProgress, index: usize) -> OutboundPrompt {
    let set = &progress.words_in_current_set;
    let Some(card) = set.get(index) else {
        return word_set(progress);
    };

    let mut text = format!("📖 Word {}/{}\n\n{} - {}", index + 1, set.len(), card.word, card.translation);
    if let Some(level) = card.cefr_level {
        text.push_str(&format!("\nLevel: {}", level));
    }
    for sentence in card.sentences.iter().take(2) {
        text.push_str(&format!("\n\n💬 {}", sentence.text));
        if !sentence.translation.is_empty() {
            text.push_str(&format!("\n   {}", sentence.translation));
        }
    }

    let mut nav = Vec::new();
    if index > 0 {
        nav.push(PromptButton::new("⬅️ Back", &ButtonAction::LessonShowWord(index - 1)));
    }
    if index + 1 < set.len() {
        nav.push(PromptButton::new("Next ➡️", &ButtonAction::LessonShowWord(index + 1)));
    } else {
        nav.push(PromptButton::new("✍️ To exercises", &ButtonAction::LessonReady));
    }

    OutboundPrompt::new(text)
        .button(
            "✅ I already know this word",
            ButtonAction::LessonAlreadyKnow {
                slot: index,
                word_id: card.word_id.clone(),
            },
        )
        .row(nav)
}

pub fn ready_for_exercises(progress: &LessonProgress) -> OutboundPrompt {
    OutboundPrompt::new(format!(
        "✍️ Time to practise {} word(s).",
        progress.words_in_current_set.len()
    ))
    .button("▶️ Start exercises", ButtonAction::ExerciseStart)
    .button("👀 Review words again", ButtonAction::LessonShowWord(0))
}

fn exercise_header(progress: &LessonProgress) -> String {
    match progress.current_phase {
        LessonPhase::Retry => format!(
            "🔁 Review {}/{}",
            progress.retry_index + 1,
            progress.retry_words.len()
        ),
        _ => format!(
            "✍️ Exercise {}/{}",
            progress.exercise_index + 1,
            progress.words_in_current_set.len()
        ),
    }
}

/// Current exercise of either phase; `None` when nothing is due.
pub fn exercise(progress: &LessonProgress, with_hint: bool) -> Option<OutboundPrompt> {
    let card = progress.current_exercise_card()?;
    let turn = progress.answer_turn();
    let mut text = format!("{}\n\n{}", exercise_header(progress), card.exercise.question_text());
    if with_hint {
        text.push_str(&format!("\n\n{}", hint_for(card)));
    }

    let prompt = match card.exercise.answer_mode() {
        AnswerMode::MultipleChoice => card
            .exercise
            .data
            .pick_options
            .iter()
            .enumerate()
            .fold(OutboundPrompt::new(text), |prompt, (i, option)| {
                prompt.button(option.clone(), ButtonAction::ExercisePickOption { option: i, turn })
            }),
        AnswerMode::FreeText => OutboundPrompt::new(text + "\n\n⌨️ Type your answer.").expecting_text(),
    };

    Some(prompt.row(vec![
        PromptButton::new("💡 Hint", &ButtonAction::ExerciseHint),
        PromptButton::new("⏭ Skip", &ButtonAction::ExerciseSkip { turn }),
    ]))
}

pub fn set_complete(progress: &LessonProgress) -> OutboundPrompt {
    OutboundPrompt::new(format!(
        "🎉 Set complete! Progress: {}/{} words.",
        progress.drilled_count(),
        progress.words_per_lesson()
    ))
    .button("➡️ Next set", ButtonAction::LessonNextSet)
    .button("📊 Statistics", ButtonAction::LessonStats)
}

pub fn retry_intro() -> &'static str {
    "🔁 Let's go over the words you missed."
}

pub fn lesson_complete(stats: &LessonStats) -> OutboundPrompt {
    OutboundPrompt::new(format!("🏆 Lesson complete!\n\n{}", stats.render()))
        .button("📚 New lesson", ButtonAction::LessonNew)
        .button("⚙️ Settings", ButtonAction::Run(Command::Settings))
}

pub fn stats(stats: &LessonStats) -> OutboundPrompt {
    OutboundPrompt::new(stats.render())
}

/// Word card for the same slot after an "already known" replacement.
pub fn replaced_note(card: &Card) -> String {
    format!("👍 Great, skipping that one. Here is another word: {}", card.word)
}

// Settings

pub fn settings(preferences: &UserPreferences) -> OutboundPrompt {
    OutboundPrompt::new(format!("⚙️ Settings\n\n{}", preferences.summary()))
        .button(
            "📅 Words per day",
            ButtonAction::SettingsEdit(SettingsField::WordsPerDay),
        )
        .button("🎓 Level", ButtonAction::SettingsEdit(SettingsField::CefrLevel))
        .button(
            "🔔 Notifications",
            ButtonAction::SettingsEdit(SettingsField::Notifications),
        )
        .button("🎯 Learning goal", ButtonAction::SettingsEdit(SettingsField::Topic))
        .button("🏠 Main menu", ButtonAction::MainMenu)
}

pub fn words_per_day_options(current: u8) -> OutboundPrompt {
    let row = WORDS_PER_DAY_OPTIONS
        .iter()
        .map(|n| {
            let label = if *n == current { format!("• {}", n) } else { n.to_string() };
            PromptButton::new(label, &ButtonAction::SettingsSetWords(*n))
        })
        .collect();
    OutboundPrompt::new("📅 How many new words per lesson?")
        .row(row)
        .button("⬅️ Back", ButtonAction::SettingsBack)
}

pub fn level_options(current: CefrLevel) -> OutboundPrompt {
    let row = CefrLevel::ALL
        .iter()
        .map(|level| {
            let label = if *level == current {
                format!("• {}", level)
            } else {
                level.to_string()
            };
            PromptButton::new(label, &ButtonAction::SettingsSetLevel(*level))
        })
        .collect();
    OutboundPrompt::new("🎓 Choose your level:")
        .row(row)
        .button("⬅️ Back", ButtonAction::SettingsBack)
}

pub fn notification_options(preferences: &UserPreferences) -> OutboundPrompt {
    let prompt = OutboundPrompt::new(format!(
        "🔔 Daily reminders are {}.\n\nPick a time for your daily reminder:",
        preferences.notification_status()
    ));
    NOTIFICATION_TIME_PRESETS
        .chunks(3)
        .fold(prompt, |prompt, times| {
            prompt.row(
                times
                    .iter()
                    .map(|time| {
                        let label = if preferences.notification_time.as_deref() == Some(*time)
                            && preferences.notifications_enabled
                        {
                            format!("• {}", time)
                        } else {
                            time.to_string()
                        };
                        PromptButton::new(label, &ButtonAction::SettingsSetTime(time.to_string()))
                    })
                    .collect(),
            )
        })
        .button(
            "✏️ Enter a time",
            ButtonAction::SettingsEdit(SettingsField::NotificationTime),
        )
        .button("🔕 Turn off", ButtonAction::SettingsSetNotifications(false))
        .button("⬅️ Back", ButtonAction::SettingsBack)
}

pub fn notification_time_input() -> OutboundPrompt {
    OutboundPrompt::new("⏰ When should I remind you? Send a time like 9:30 or 21:00.")
        .button("⬅️ Back", ButtonAction::SettingsBack)
        .expecting_text()
}

pub fn topic_page(selection: &TopicSelection) -> OutboundPrompt {
    if selection.topics.is_empty() {
        return OutboundPrompt::new("🎯 No learning goals are available right now.")
            .button("⬅️ Back", ButtonAction::SettingsBack);
    }

    let (offset, topics) = selection.current_page();
    let mut text = String::from("🎯 Choose your learning goal\n");
    for (i, topic) in topics.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, topic));
    }
    text.push_str(&format!(
        "\n\nPage {} of {}",
        selection.page + 1,
        selection.page_count()
    ));

    let picks = (0..topics.len())
        .map(|i| PromptButton::new((i + 1).to_string(), &ButtonAction::SettingsSetTopic(offset + i)))
        .collect();

    let mut nav = Vec::new();
    if selection.page > 0 {
        nav.push(PromptButton::new(
            "⬅️ Previous",
            &ButtonAction::SettingsTopicPage(selection.page - 1),
        ));
    }
    if selection.has_page(selection.page + 1) {
        nav.push(PromptButton::new(
            "Next ➡️",
            &ButtonAction::SettingsTopicPage(selection.page + 1),
        ));
    }

    OutboundPrompt::new(text)
        .row(picks)
        .row(nav)
        .button("⬅️ Back", ButtonAction::SettingsBack)
}

// Account linking

pub fn link_prompt(link: Option<&LinkToken>) -> OutboundPrompt {
    let text = match link {
        Some(link) => format!(
            "🔗 To keep your progress, link your Fluently account:\n{}\n\nPress the button once you're done.",
            link.link_url
        ),
        None => "🔗 Your link has expired. Request a new one.".to_string(),
    };
    OutboundPrompt::new(text)
        .button("✅ I've linked my account", ButtonAction::LinkCheck)
        .button("🔁 New link", ButtonAction::LinkNew)
}

pub fn account_linked() -> OutboundPrompt {
    OutboundPrompt::new("✅ Your account is linked!")
        .button("📚 Start a lesson", ButtonAction::LessonNew)
        .button("🏠 Main menu", ButtonAction::MainMenu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lesson::test_support::lesson;
    use crate::domain::lesson::{next_word_set, Answer};

    fn started() -> LessonProgress {
        let mut progress = LessonProgress::new(lesson(3, 6));
        let set = next_word_set(&progress).unwrap();
        progress.begin_set(set).unwrap();
        progress
    }

    #[test]
    fn word_card_navigation_ends_with_exercises() {
        let progress = started();
        let first = word_card(&progress, 0);
        assert!(first.has_action(&ButtonAction::LessonAlreadyKnow {
            slot: 0,
            word_id: progress.words_in_current_set[0].word_id.clone(),
        }));
        assert!(first.has_action(&ButtonAction::LessonShowWord(1)));
        assert!(!first.has_action(&ButtonAction::LessonReady));

        let last = word_card(&progress, 2);
        assert!(last.has_action(&ButtonAction::LessonShowWord(1)));
        assert!(last.has_action(&ButtonAction::LessonReady));
    }

    #[test]
    fn multiple_choice_exercise_offers_options() {
        let progress = started();
        let prompt = exercise(&progress, false).unwrap();
        assert!(prompt.text.starts_with("✍️ Exercise 1/3"));
        assert!(prompt.has_action(&ButtonAction::ExercisePickOption { option: 0, turn: 0 }));
        assert!(prompt.has_action(&ButtonAction::ExercisePickOption { option: 1, turn: 0 }));
        assert!(prompt.has_action(&ButtonAction::ExerciseSkip { turn: 0 }));
        assert!(!prompt.expects_text_input);
    }

    #[test]
    fn answer_buttons_follow_the_turn() {
        let mut progress = started();
        progress.record_answer(&Answer::Skip).unwrap();
        let prompt = exercise(&progress, false).unwrap();
        assert!(prompt.has_action(&ButtonAction::ExercisePickOption { option: 0, turn: 1 }));
        assert!(!prompt.has_action(&ButtonAction::ExercisePickOption { option: 0, turn: 0 }));
    }

    #[test]
    fn topic_pages_link_to_neighbours() {
        let mut selection = TopicSelection::new((0..12).map(|i| format!("topic{}", i)).collect());
        let first = topic_page(&selection);
        assert!(first.text.contains("Page 1 of 3"));
        assert!(first.has_action(&ButtonAction::SettingsSetTopic(4)));
        assert!(first.has_action(&ButtonAction::SettingsTopicPage(1)));
        assert!(!first.has_action(&ButtonAction::SettingsTopicPage(0)));

        selection.page = 2;
        let last = topic_page(&selection);
        assert!(last.text.contains("topic11"));
        assert!(last.has_action(&ButtonAction::SettingsSetTopic(10)));
        assert!(last.has_action(&ButtonAction::SettingsTopicPage(1)));
        assert!(!last.has_action(&ButtonAction::SettingsTopicPage(3)));
    }

    #[test]
    fn notification_screen_marks_current_time() {
        let mut prefs = UserPreferences::default();
        prefs.set_notification_time("9:00").unwrap();
        let prompt = notification_options(&prefs);
        assert!(prompt.text.contains("on at 09:00"));
        assert!(prompt.buttons.iter().flatten().any(|b| b.label == "• 09:00"));
        assert!(prompt.has_action(&ButtonAction::SettingsEdit(SettingsField::NotificationTime)));
        assert!(notification_time_input().expects_text_input);
    }

    #[test]
    fn hint_is_appended_on_request() {
        let progress = started();
        let prompt = exercise(&progress, true).unwrap();
        assert!(prompt.text.contains("💡"));
    }

    #[test]
    fn no_exercise_after_set_is_done() {
        let mut progress = started();
        for _ in 0..3 {
            progress.record_answer(&Answer::Skip).unwrap();
        }
        assert!(exercise(&progress, false).is_none());
    }

    #[test]
    fn questionnaire_buttons_encode_answers() {
        let prompt = question(Question::Habits);
        assert!(prompt.has_action(&ButtonAction::QuestionAnswer {
            question: Question::Habits,
            value: "10".into(),
        }));
    }

    #[test]
    fn apology_offers_retry_when_possible() {
        let prompt = apology(Some(ButtonAction::Run(Command::Learn)));
        assert!(prompt.has_action(&ButtonAction::Run(Command::Learn)));
        assert!(prompt.has_action(&ButtonAction::MainMenu));
        assert!(!apology(None).has_action(&ButtonAction::Run(Command::Learn)));
    }
}

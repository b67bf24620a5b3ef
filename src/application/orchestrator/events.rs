//! Inbound events and button callback data.
//!
//! Buttons carry a compact `family:verb[:arg]` action string; `ButtonAction`
//! parses and prints it so prompts and handlers never disagree on format.
//! Buttons that change lesson progress also carry what the learner saw (the
//! word id or the answer turn), so a tap on an outdated message is refused.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ValidationError, WordId};
use crate::domain::lesson::CefrLevel;
use crate::domain::onboarding::Question;

/// Phrases that cancel the current flow when sent as plain text.
const STOP_PHRASES: [&str; 5] = ["stop", "cancel", "стоп", "отмена", "хватит"];

pub fn is_stop_phrase(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    STOP_PHRASES.contains(&normalized.as_str())
}

/// Slash commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Learn,
    Cancel,
    Help,
    Settings,
    Test,
    Stats,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Learn => "learn",
            Command::Cancel => "cancel",
            Command::Help => "help",
            Command::Settings => "settings",
            Command::Test => "test",
            Command::Stats => "stats",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

impl FromStr for Command {
    type Err = ValidationError;

    /// Accepts `learn`, `/learn` and `/learn@some_bot`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/');
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        match name.as_str() {
            "start" => Ok(Command::Start),
            "learn" | "lesson" => Ok(Command::Learn),
            "cancel" | "stop" => Ok(Command::Cancel),
            "help" => Ok(Command::Help),
            "settings" => Ok(Command::Settings),
            "test" => Ok(Command::Test),
            "stats" => Ok(Command::Stats),
            other => Err(ValidationError::invalid_format(
                "command",
                format!("unknown command '{}'", other),
            )),
        }
    }
}

/// Settings screen a learner can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    WordsPerDay,
    CefrLevel,
    Notifications,
    /// Typed reminder time.
    NotificationTime,
    /// Goal topic picker.
    Topic,
}

impl SettingsField {
    const ALL: [SettingsField; 5] = [
        SettingsField::WordsPerDay,
        SettingsField::CefrLevel,
        SettingsField::Notifications,
        SettingsField::NotificationTime,
        SettingsField::Topic,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            SettingsField::WordsPerDay => "words_per_day",
            SettingsField::CefrLevel => "cefr_level",
            SettingsField::Notifications => "notifications",
            SettingsField::NotificationTime => "notification_time",
            SettingsField::Topic => "goal_topic",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

/// Parsed button callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Same as typing the command.
    Run(Command),
    MainMenu,

    OnboardingNext,
    QuestionAnswer { question: Question, value: String },

    TestStart,
    TestSkip,
    TestAnswer(usize),
    TestDontKnow,
    TestStop,
    TestContinue,

    LessonNew,
    LessonContinue,
    LessonRestart,
    LessonStartWordSet,
    LessonNextSet,
    LessonShowWord(usize),
    /// "Already known" on the card showing `word_id` in `slot`.
    LessonAlreadyKnow { slot: usize, word_id: WordId },
    LessonReady,
    LessonStats,
    /// Retries lesson completion after a failed progress sync.
    LessonFinish,

    ExerciseStart,
    /// Option `option` of the exercise shown at answer turn `turn`.
    ExercisePickOption { option: usize, turn: usize },
    ExerciseSkip { turn: usize },
    ExerciseHint,

    SettingsEdit(SettingsField),
    SettingsSetWords(u8),
    SettingsSetLevel(CefrLevel),
    SettingsSetNotifications(bool),
    /// Preset reminder time, `HH:MM`.
    SettingsSetTime(String),
    SettingsTopicPage(usize),
    /// Topic at this position in the listed topics.
    SettingsSetTopic(usize),
    SettingsBack,

    LinkCheck,
    LinkNew,
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::Run(cmd) => write!(f, "cmd:{}", cmd.name()),
            ButtonAction::MainMenu => write!(f, "menu:main"),
            ButtonAction::OnboardingNext => write!(f, "onboarding:next"),
            ButtonAction::QuestionAnswer { question, value } => {
                write!(f, "q:{}:{}", question.field(), value)
            }
            ButtonAction::TestStart => write!(f, "test:start"),
            ButtonAction::TestSkip => write!(f, "test:skip"),
            ButtonAction::TestAnswer(i) => write!(f, "test:answer:{}", i),
            ButtonAction::TestDontKnow => write!(f, "test:dont_know"),
            ButtonAction::TestStop => write!(f, "test:stop"),
            ButtonAction::TestContinue => write!(f, "test:continue"),
            ButtonAction::LessonNew => write!(f, "lesson:new"),
            ButtonAction::LessonContinue => write!(f, "lesson:continue"),
            ButtonAction::LessonRestart => write!(f, "lesson:restart"),
            ButtonAction::LessonStartWordSet => write!(f, "lesson:start_word_set"),
            ButtonAction::LessonNextSet => write!(f, "lesson:next_set"),
            ButtonAction::LessonShowWord(i) => write!(f, "lesson:show_word:{}", i),
            ButtonAction::LessonAlreadyKnow { slot, word_id } => {
                write!(f, "lesson:already_know:{}:{}", slot, word_id)
            }
            ButtonAction::LessonReady => write!(f, "lesson:ready"),
            ButtonAction::LessonStats => write!(f, "lesson:stats"),
            ButtonAction::LessonFinish => write!(f, "lesson:finish"),
            ButtonAction::ExerciseStart => write!(f, "exercise:start"),
            ButtonAction::ExercisePickOption { option, turn } => {
                write!(f, "exercise:pick_option:{}:{}", option, turn)
            }
            ButtonAction::ExerciseSkip { turn } => write!(f, "exercise:skip:{}", turn),
            ButtonAction::ExerciseHint => write!(f, "exercise:hint"),
            ButtonAction::SettingsEdit(field) => write!(f, "settings:{}", field.as_str()),
            ButtonAction::SettingsSetWords(n) => write!(f, "settings:set_words:{}", n),
            ButtonAction::SettingsSetLevel(level) => write!(f, "settings:set_level:{}", level),
            ButtonAction::SettingsSetNotifications(on) => {
                write!(f, "settings:set_notifications:{}", if *on { "on" } else { "off" })
            }
            ButtonAction::SettingsSetTime(time) => write!(f, "settings:set_time:{}", time),
            ButtonAction::SettingsTopicPage(page) => write!(f, "settings:topic_page:{}", page),
            ButtonAction::SettingsSetTopic(i) => write!(f, "settings:set_topic:{}", i),
            ButtonAction::SettingsBack => write!(f, "settings:back"),
            ButtonAction::LinkCheck => write!(f, "link:check"),
            ButtonAction::LinkNew => write!(f, "link:new"),
        }
    }
}

fn invalid(raw: &str) -> ValidationError {
    ValidationError::invalid_format("action", format!("unknown button action '{}'", raw))
}

fn index(arg: Option<&str>, raw: &str) -> Result<usize, ValidationError> {
    arg.and_then(|a| a.parse().ok()).ok_or_else(|| invalid(raw))
}

/// Splits `first:rest` where both halves are non-empty.
fn pair<'a>(arg: Option<&'a str>, raw: &str) -> Result<(&'a str, &'a str), ValidationError> {
    arg.and_then(|a| a.split_once(':'))
        .filter(|(first, rest)| !first.is_empty() && !rest.is_empty())
        .ok_or_else(|| invalid(raw))
}

impl FromStr for ButtonAction {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.trim().splitn(3, ':');
        let family = parts.next().unwrap_or_default();
        let verb = parts.next().unwrap_or_default();
        let arg = parts.next();

        let action = match (family, verb) {
            ("cmd", name) => ButtonAction::Run(name.parse().map_err(|_| invalid(raw))?),
            ("menu", "main") => ButtonAction::MainMenu,
            ("onboarding", "next") => ButtonAction::OnboardingNext,
            ("q", field) => {
                let question = Question::from_field(field).ok_or_else(|| invalid(raw))?;
                let value = arg.filter(|v| !v.is_empty()).ok_or_else(|| invalid(raw))?;
                ButtonAction::QuestionAnswer {
                    question,
                    value: value.to_string(),
                }
            }
            ("test", "start") => ButtonAction::TestStart,
            ("test", "skip") => ButtonAction::TestSkip,
            ("test", "answer") => ButtonAction::TestAnswer(index(arg, raw)?),
            ("test", "dont_know") => ButtonAction::TestDontKnow,
            ("test", "stop") => ButtonAction::TestStop,
            ("test", "continue") => ButtonAction::TestContinue,
            ("lesson", "new") => ButtonAction::LessonNew,
            ("lesson", "continue") => ButtonAction::LessonContinue,
            ("lesson", "restart") => ButtonAction::LessonRestart,
            ("lesson", "start_word_set") => ButtonAction::LessonStartWordSet,
            ("lesson", "next_set") => ButtonAction::LessonNextSet,
            ("lesson", "show_word") => ButtonAction::LessonShowWord(index(arg, raw)?),
            ("lesson", "already_know") => {
                let (slot, word_id) = pair(arg, raw)?;
                ButtonAction::LessonAlreadyKnow {
                    slot: index(Some(slot), raw)?,
                    word_id: WordId::new(word_id),
                }
            }
            ("lesson", "ready") => ButtonAction::LessonReady,
            ("lesson", "stats") => ButtonAction::LessonStats,
            ("lesson", "finish") => ButtonAction::LessonFinish,
            ("exercise", "start") => ButtonAction::ExerciseStart,
            ("exercise", "pick_option") => {
                let (option, turn) = pair(arg, raw)?;
                ButtonAction::ExercisePickOption {
                    option: index(Some(option), raw)?,
                    turn: index(Some(turn), raw)?,
                }
            }
            ("exercise", "skip") => ButtonAction::ExerciseSkip {
                turn: index(arg, raw)?,
            },
            ("exercise", "hint") => ButtonAction::ExerciseHint,
            ("settings", "set_words") => {
                let words = arg.and_then(|a| a.parse().ok()).ok_or_else(|| invalid(raw))?;
                ButtonAction::SettingsSetWords(words)
            }
            ("settings", "set_level") => {
                let level = arg.and_then(|a| a.parse().ok()).ok_or_else(|| invalid(raw))?;
                ButtonAction::SettingsSetLevel(level)
            }
            ("settings", "set_notifications") => match arg {
                Some("on") => ButtonAction::SettingsSetNotifications(true),
                Some("off") => ButtonAction::SettingsSetNotifications(false),
                _ => return Err(invalid(raw)),
            },
            ("settings", "set_time") => {
                let time = arg.filter(|t| !t.is_empty()).ok_or_else(|| invalid(raw))?;
                ButtonAction::SettingsSetTime(time.to_string())
            }
            ("settings", "topic_page") => ButtonAction::SettingsTopicPage(index(arg, raw)?),
            ("settings", "set_topic") => ButtonAction::SettingsSetTopic(index(arg, raw)?),
            ("settings", "back") => ButtonAction::SettingsBack,
            ("settings", name) => match (SettingsField::from_name(name), arg) {
                (Some(field), None) => ButtonAction::SettingsEdit(field),
                _ => return Err(invalid(raw)),
            },
            ("link", "check") => ButtonAction::LinkCheck,
            ("link", "new") => ButtonAction::LinkNew,
            _ => return Err(invalid(raw)),
        };
        Ok(action)
    }
}

/// One event delivered by the transport for a single learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command(Command),
    Button(ButtonAction),
    Text(String),
    /// Unknown command or button data; answered with a re-prompt.
    Unrecognized(String),
}

impl InboundEvent {
    /// Classifies a chat message: known slash commands become commands.
    pub fn from_message(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('/') {
            match trimmed.split_whitespace().next().unwrap_or(trimmed).parse() {
                Ok(cmd) => InboundEvent::Command(cmd),
                Err(_) => InboundEvent::Unrecognized(trimmed.to_string()),
            }
        } else {
            InboundEvent::Text(text.to_string())
        }
    }

    pub fn from_callback(data: &str) -> Self {
        match data.parse() {
            Ok(action) => InboundEvent::Button(action),
            Err(_) => InboundEvent::Unrecognized(data.to_string()),
        }
    }

    /// Action that replays this event from a retry button.
    pub fn retry_action(&self) -> Option<ButtonAction> {
        match self {
            InboundEvent::Command(cmd) => Some(ButtonAction::Run(*cmd)),
            InboundEvent::Button(action) => Some(action.clone()),
            InboundEvent::Text(_) | InboundEvent::Unrecognized(_) => None,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Command(_) => "command",
            InboundEvent::Button(_) => "button",
            InboundEvent::Text(_) => "text",
            InboundEvent::Unrecognized(_) => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_and_without_slash() {
        assert_eq!("learn".parse::<Command>().unwrap(), Command::Learn);
        assert_eq!("/settings".parse::<Command>().unwrap(), Command::Settings);
        assert_eq!("/start@fluently_bot".parse::<Command>().unwrap(), Command::Start);
        assert!("/dance".parse::<Command>().is_err());
    }

    #[test]
    fn messages_are_classified() {
        assert_eq!(InboundEvent::from_message("/learn now"), InboundEvent::Command(Command::Learn));
        assert_eq!(InboundEvent::from_message("hello"), InboundEvent::Text("hello".into()));
        assert!(matches!(
            InboundEvent::from_message("/nope"),
            InboundEvent::Unrecognized(_)
        ));
    }

    #[test]
    fn stop_phrases_are_case_insensitive() {
        assert!(is_stop_phrase("  STOP "));
        assert!(is_stop_phrase("Отмена"));
        assert!(!is_stop_phrase("stopwatch"));
    }

    #[test]
    fn actions_print_what_they_parse() {
        let actions = vec![
            ButtonAction::Run(Command::Learn),
            ButtonAction::MainMenu,
            ButtonAction::QuestionAnswer {
                question: Question::Habits,
                value: "10".into(),
            },
            ButtonAction::TestAnswer(3),
            ButtonAction::LessonShowWord(2),
            ButtonAction::LessonAlreadyKnow {
                slot: 0,
                word_id: WordId::new("3f2a-9c"),
            },
            ButtonAction::LessonFinish,
            ButtonAction::ExercisePickOption { option: 1, turn: 4 },
            ButtonAction::ExerciseSkip { turn: 0 },
            ButtonAction::SettingsEdit(SettingsField::CefrLevel),
            ButtonAction::SettingsEdit(SettingsField::Topic),
            ButtonAction::SettingsSetLevel(CefrLevel::B2),
            ButtonAction::SettingsSetNotifications(false),
            ButtonAction::SettingsSetTime("09:30".into()),
            ButtonAction::SettingsTopicPage(2),
            ButtonAction::SettingsSetTopic(7),
            ButtonAction::LinkCheck,
        ];
        for action in actions {
            assert_eq!(action.to_string().parse::<ButtonAction>().unwrap(), action);
        }
    }

    #[test]
    fn malformed_actions_are_rejected() {
        for raw in [
            "",
            "lesson",
            "lesson:show_word",
            "lesson:show_word:x",
            "q:goal",
            "q:unknown:x",
            "settings:set_level:Z9",
            "settings:set_notifications:maybe",
            "settings:set_time:",
            "settings:topic_page:next",
            "lesson:already_know:1",
            "lesson:already_know:1:",
            "exercise:pick_option:0",
            "exercise:pick_option:0:x",
            "exercise:skip",
            "cmd:dance",
        ] {
            assert!(raw.parse::<ButtonAction>().is_err(), "{} should fail", raw);
        }
    }

    #[test]
    fn lesson_buttons_keep_what_was_shown() {
        assert_eq!(
            "lesson:already_know:2:w-17".parse::<ButtonAction>().unwrap(),
            ButtonAction::LessonAlreadyKnow {
                slot: 2,
                word_id: WordId::new("w-17"),
            }
        );
        assert_eq!(
            ButtonAction::ExercisePickOption { option: 0, turn: 12 }.to_string(),
            "exercise:pick_option:0:12"
        );
        assert_eq!(
            "settings:set_time:21:00".parse::<ButtonAction>().unwrap(),
            ButtonAction::SettingsSetTime("21:00".into())
        );
    }

    #[test]
    fn unknown_callback_is_unrecognized() {
        assert_eq!(
            InboundEvent::from_callback("lesson:ready"),
            InboundEvent::Button(ButtonAction::LessonReady)
        );
        assert!(matches!(
            InboundEvent::from_callback("bogus"),
            InboundEvent::Unrecognized(_)
        ));
    }

    #[test]
    fn retry_replays_buttons_and_commands() {
        assert_eq!(
            InboundEvent::Command(Command::Learn).retry_action(),
            Some(ButtonAction::Run(Command::Learn))
        );
        assert_eq!(InboundEvent::Text("x".into()).retry_action(), None);
    }
}

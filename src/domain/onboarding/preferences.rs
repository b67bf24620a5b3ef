//! Learner preferences edited through onboarding and settings.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;
use crate::domain::lesson::CefrLevel;

pub const WORDS_PER_DAY_OPTIONS: [u8; 4] = [5, 10, 15, 20];

/// Reminder times offered as buttons; anything else is typed in.
pub const NOTIFICATION_TIME_PRESETS: [&str; 9] = [
    "08:00", "09:00", "10:00", "12:00", "15:00", "18:00", "20:00", "21:00", "22:00",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub words_per_day: u8,
    pub cefr_level: CefrLevel,
    pub notifications_enabled: bool,
    /// Daily reminder time as `HH:MM`.
    #[serde(default)]
    pub notification_time: Option<String>,
    /// Learning goal picked from the backend's topic list.
    #[serde(default)]
    pub goal_topic: Option<String>,
}

/// Normalizes a typed reminder time to `HH:MM`.
///
/// Accepts `9:30`, `09.30`, `930`, `0930` and inner spaces.
pub fn parse_notification_time(raw: &str) -> Result<String, ValidationError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let candidate = if !compact.is_empty() && compact.chars().all(|c| c.is_ascii_digit()) {
        match compact.len() {
            3 | 4 => {
                let (hours, minutes) = compact.split_at(compact.len() - 2);
                format!("{}:{}", hours, minutes)
            }
            _ => compact,
        }
    } else {
        compact.replace('.', ":")
    };

    NaiveTime::parse_from_str(&candidate, "%H:%M")
        .map(|time| time.format("%H:%M").to_string())
        .map_err(|_| {
            ValidationError::invalid_format(
                "notification_time",
                format!("'{}' is not a time of day", raw.trim()),
            )
        })
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            words_per_day: 10,
            cefr_level: CefrLevel::A1,
            notifications_enabled: true,
            notification_time: None,
            goal_topic: None,
        }
    }
}

impl UserPreferences {
    pub fn set_words_per_day(&mut self, words: u8) -> Result<(), ValidationError> {
        if !WORDS_PER_DAY_OPTIONS.contains(&words) {
            return Err(ValidationError::out_of_range(
                "words_per_day",
                i32::from(WORDS_PER_DAY_OPTIONS[0]),
                i32::from(WORDS_PER_DAY_OPTIONS[WORDS_PER_DAY_OPTIONS.len() - 1]),
                i32::from(words),
            ));
        }
        self.words_per_day = words;
        Ok(())
    }

    /// Turns reminders on at the given time.
    pub fn set_notification_time(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.notification_time = Some(parse_notification_time(raw)?);
        self.notifications_enabled = true;
        Ok(())
    }

    pub fn disable_notifications(&mut self) {
        self.notifications_enabled = false;
        self.notification_time = None;
    }

    /// `off`, `on` or `on at HH:MM`.
    pub fn notification_status(&self) -> String {
        match (&self.notification_time, self.notifications_enabled) {
            (_, false) => "off".to_string(),
            (Some(time), true) => format!("on at {}", time),
            (None, true) => "on".to_string(),
        }
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "📅 Words per day: {}\n🎓 Level: {}\n🔔 Notifications: {}",
            self.words_per_day,
            self.cefr_level,
            self.notification_status()
        );
        if let Some(topic) = &self.goal_topic {
            text.push_str(&format!("\n🎯 Goal: {}", topic));
        }
        text
    }
}

//! Outbound prompt returned for every handled event.

use serde::{Deserialize, Serialize};

use super::events::ButtonAction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptButton {
    pub label: String,
    pub action: String,
}

impl PromptButton {
    pub fn new(label: impl Into<String>, action: &ButtonAction) -> Self {
        Self {
            label: label.into(),
            action: action.to_string(),
        }
    }
}

/// Plain text plus rows of buttons. Rendering is the transport's job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundPrompt {
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<Vec<PromptButton>>,
    /// True when the next message from the learner is a typed answer.
    #[serde(default)]
    pub expects_text_input: bool,
}

impl OutboundPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Adds a row holding a single button.
    pub fn button(mut self, label: impl Into<String>, action: ButtonAction) -> Self {
        self.buttons.push(vec![PromptButton::new(label, &action)]);
        self
    }

    pub fn row(mut self, row: Vec<PromptButton>) -> Self {
        if !row.is_empty() {
            self.buttons.push(row);
        }
        self
    }

    pub fn expecting_text(mut self) -> Self {
        self.expects_text_input = true;
        self
    }

    /// Puts `note` above the existing text.
    pub fn with_note(mut self, note: impl AsRef<str>) -> Self {
        let note = note.as_ref();
        if !note.is_empty() {
            self.text = format!("{}\n\n{}", note, self.text);
        }
        self
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().flatten().map(|b| b.action.as_str())
    }

    pub fn has_action(&self, action: &ButtonAction) -> bool {
        let wanted = action.to_string();
        self.actions().any(|a| a == wanted)
    }
}

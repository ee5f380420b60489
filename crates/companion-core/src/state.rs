//! UI-agnostic conversation state
//!
//! These types are shared by every front end and don't depend on any UI framework.
//! The orchestrator is the only writer; front ends read them to render.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// Who authored a turn. `System` is the model's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::System => "system",
        }
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// The reply was cut off and can be continued.
    pub more: bool,
    /// Display key; position in the history when the turn was added.
    pub sequence: usize,
}

impl Message {
    /// Only model turns offer the copy action.
    pub fn is_copyable(&self) -> bool {
        self.role != Role::User
    }
}

/// Model parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Everything one companion session knows. Lives as long as the widget does.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    pub pending_input: String,
    busy: bool,
    pub templates: Vec<String>,
    pub selected_template: Option<String>,
    pub settings: ChatSettings,
}

impl ConversationState {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into(), false);
    }

    pub fn push_reply(&mut self, content: impl Into<String>, more: bool) {
        self.push(Role::System, content.into(), more);
    }

    fn push(&mut self, role: Role, content: String, more: bool) {
        let sequence = self.messages.len();
        self.messages.push(Message {
            role,
            content,
            more,
            sequence,
        });
    }

    /// True when the last turn is a truncated model reply.
    pub fn can_continue(&self) -> bool {
        self.messages
            .last()
            .is_some_and(|m| m.role == Role::System && m.more)
    }

    /// Whether the message at `index` should show the continue action.
    pub fn shows_continue(&self, index: usize) -> bool {
        index + 1 == self.messages.len() && self.can_continue()
    }

    /// Extend the last model reply with continuation text.
    ///
    /// Returns false and leaves history alone when the last turn is not a model reply.
    pub fn extend_last_reply(&mut self, text: &str, more: bool) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::System => {
                last.content.push(' ');
                last.content.push_str(text);
                last.more = more;
                true
            }
            _ => false,
        }
    }

    /// Whether the message at `index` should show the copy action.
    ///
    /// Only the most recent model reply does, since that is the one the copy key takes.
    pub fn shows_copy(&self, index: usize) -> bool {
        self.messages
            .iter()
            .rposition(|m| m.is_copyable())
            .is_some_and(|last| last == index)
    }

    /// The most recent model reply, if any.
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::System)
    }

    /// Drop the session's turns and draft. Settings and templates survive.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending_input.clear();
        self.selected_template = None;
    }
}

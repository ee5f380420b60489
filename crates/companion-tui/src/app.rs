use anyhow::Result;
use companion_core::error::Result as CoreResult;
use companion_core::{
    CompanionError, Config, ConversationState, GatewayEnvelope, Message, Orchestrator,
    PendingReply, Provider, UiEvent,
};
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::clipboard;

/// Ticks a toast stays in the footer (300ms each).
const TOAST_TICKS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub is_error: bool,
    ticks_left: u8,
}

/// A gateway call running in the background.
pub struct ReplyTask {
    pending: PendingReply,
    handle: JoinHandle<CoreResult<GatewayEnvelope>>,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub orchestrator: Orchestrator,
    pub reply_task: Option<ReplyTask>,

    // Draft editing
    pub input_cursor: usize, // cursor position in chars

    // Chat scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area
    pub chat_width: u16,  // inner width, for wrap calculations

    // Template picker
    pub show_template_picker: bool,
    pub template_picker_state: ListState,

    pub toast: Option<Toast>,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub username: String,
    pub provider: Provider,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let gateway = config.build_gateway()?;
        let templates = config.build_template_service()?;
        let orchestrator = Orchestrator::new(
            config.chat_settings(),
            config.context_id(),
            gateway,
            templates,
        );

        Ok(Self::with_orchestrator(orchestrator, config.display_name(), config.provider()))
    }

    pub fn with_orchestrator(orchestrator: Orchestrator, username: String, provider: Provider) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            orchestrator,
            reply_task: None,
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            show_template_picker: false,
            template_picker_state: ListState::default(),
            toast: None,
            animation_frame: 0,
            username,
            provider,
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        self.orchestrator.state()
    }

    pub fn draft(&self) -> &str {
        &self.conversation().pending_input
    }

    pub async fn load_templates(&mut self) {
        let context_id = self.orchestrator.context_id().to_string();
        self.orchestrator.load_available_templates(&context_id).await;
    }

    /// Start a question or a continuation; the gateway call runs in a task.
    pub fn submit(&mut self, continuation: bool) {
        let text = if continuation {
            String::new()
        } else {
            self.draft().to_string()
        };

        let Some(pending) = self.orchestrator.begin_submit(&text, continuation) else {
            return;
        };

        let gateway = self.orchestrator.gateway();
        let body = pending.body().to_string();
        let handle = tokio::spawn(async move { gateway.send(&body).await });
        self.reply_task = Some(ReplyTask { pending, handle });

        self.input_cursor = 0;
        self.scroll_chat_to_bottom();
    }

    /// Hand a finished gateway call back to the orchestrator.
    pub async fn poll_reply(&mut self) {
        let finished = self
            .reply_task
            .as_ref()
            .is_some_and(|task| task.handle.is_finished());
        if !finished {
            return;
        }

        if let Some(ReplyTask { pending, handle }) = self.reply_task.take() {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(CompanionError::Task(e.to_string())));
            self.orchestrator.finish_reply(pending, outcome);
            self.scroll_chat_to_bottom();
        }
    }

    pub async fn apply(&mut self, event: UiEvent) {
        self.orchestrator.handle_event(event).await;
        self.input_cursor = self.input_cursor.min(self.draft().chars().count());
    }

    pub fn set_draft(&mut self, text: String, cursor: usize) {
        self.orchestrator.set_pending_input(text);
        self.input_cursor = cursor.min(self.draft().chars().count());
    }

    pub fn copy_last_reply(&mut self) {
        let Some(text) = self.conversation().last_reply().map(|m| m.content.clone()) else {
            self.show_toast("Nothing to copy yet", true);
            return;
        };

        match clipboard::copy(&text) {
            Ok(method) => {
                tracing::debug!(?method, "reply copied");
                self.show_toast("Suggestion copied to clipboard", false);
            }
            Err(e) => {
                tracing::warn!(error = %e, "copy failed");
                self.show_toast(format!("Copy failed: {}", e), true);
            }
        }
    }

    pub fn show_toast(&mut self, text: impl Into<String>, is_error: bool) {
        self.toast = Some(Toast {
            text: text.into(),
            is_error,
            ticks_left: TOAST_TICKS,
        });
    }

    pub fn tick(&mut self) {
        if self.conversation().is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if let Some(toast) = &mut self.toast {
            toast.ticks_left = toast.ticks_left.saturating_sub(1);
            if toast.ticks_left == 0 {
                self.toast = None;
            }
        }
    }

    pub fn open_template_picker(&mut self) {
        if self.conversation().templates.is_empty() {
            self.show_toast("No question templates available", true);
            return;
        }
        self.show_template_picker = true;
        self.template_picker_state.select(Some(0));
    }

    pub fn template_picker_nav_down(&mut self) {
        let len = self.conversation().templates.len();
        if len == 0 {
            return;
        }
        let i = self.template_picker_state.selected().map_or(0, |i| (i + 1) % len);
        self.template_picker_state.select(Some(i));
    }

    pub fn template_picker_nav_up(&mut self) {
        let len = self.conversation().templates.len();
        if len == 0 {
            return;
        }
        let i = self
            .template_picker_state
            .selected()
            .map_or(0, |i| if i == 0 { len - 1 } else { i - 1 });
        self.template_picker_state.select(Some(i));
    }

    pub fn selected_template(&self) -> Option<String> {
        self.template_picker_state
            .selected()
            .and_then(|i| self.conversation().templates.get(i).cloned())
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll so the newest turn (or "Thinking...") is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        let total_lines = chat_line_count(self.conversation().messages(), wrap_width);
        self.chat_scroll = bottom_scroll(total_lines, visible_height);
    }
}

/// Rendered height of the chat, counting wrapped lines.
fn chat_line_count(messages: &[Message], wrap_width: usize) -> usize {
    let wrap_width = wrap_width.max(1);
    let mut total_lines = 0usize;
    for msg in messages {
        total_lines += 1; // sender line
        for line in msg.content.lines() {
            total_lines += line.chars().count() / wrap_width + 1;
        }
        total_lines += 2; // action hints + blank line
    }
    total_lines + 2 // "Thinking..." indicator
}

/// Scroll offset for the bottom of the chat, pinned to what a `u16` offset can reach.
fn bottom_scroll(total_lines: usize, visible_height: u16) -> u16 {
    let offset = total_lines.saturating_sub(visible_height as usize);
    u16::try_from(offset).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_count_includes_wraps_and_hints() {
        let mut state = ConversationState::default();
        state.push_user("short");
        state.push_reply("x".repeat(120), false);

        // 1 + 1 + 2 for the user turn, 1 + 3 + 2 for the wrapped reply, 2 for the indicator.
        assert_eq!(chat_line_count(state.messages(), 50), 4 + 6 + 2);
        assert_eq!(bottom_scroll(12, 20), 0);
        assert_eq!(bottom_scroll(30, 20), 10);
    }

    #[test]
    fn very_long_reply_pins_scroll_instead_of_overflowing() {
        let mut state = ConversationState::default();
        state.push_user("dump the deployment log");
        state.push_reply("line\n".repeat(70_000), false);

        let total = chat_line_count(state.messages(), 80);
        assert!(total > u16::MAX as usize);
        assert_eq!(bottom_scroll(total, 20), u16::MAX);
    }
}

//! Conversation orchestration
//!
//! The orchestrator owns the [`ConversationState`] and is the only code that talks to
//! the API gateway and the template service. Every failure ends up as a chat turn.
//!
//! Submitting is split around the gateway call so a front end can run that call in
//! the background: [`Orchestrator::begin_submit`] records the question and builds the
//! request, [`Orchestrator::finish_reply`] applies whatever the gateway answered.
//! [`Orchestrator::submit_user_message`] does both in one await.

use std::sync::Arc;

use crate::error::{format_error_turn, CompanionError, Result};
use crate::events::UiEvent;
use crate::gateway::{ApiGateway, ChatRequest, Completion, GatewayEnvelope, RequestMessage};
use crate::state::{ChatSettings, ConversationState, Role};
use crate::templates::TemplateService;

/// Instruction pinned in front of every request. Never stored in history.
pub const SYSTEM_INSTRUCTION: &str = "You need to assist the person asking you questions and tasks about Copado. \
Copado is a Salesforce Devops and Deployment tool, and most of changes in User Stories, \
Promotions and Deployments are related to Salesforce features and Salesforce metadata";

/// Synthetic user turn appended when asking for a continuation.
pub const CONTINUE_PROMPT: &str = "Please continue";

/// A request that has been recorded and is waiting for the gateway.
#[derive(Debug, Clone)]
pub struct PendingReply {
    body: String,
    continuation: bool,
}

impl PendingReply {
    /// Serialized [`ChatRequest`] to hand to the gateway.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Build the outbound request from the history.
pub fn build_request(state: &ConversationState, continuation: bool) -> ChatRequest {
    let mut messages = Vec::with_capacity(state.messages().len() + 2);
    messages.push(RequestMessage::new(Role::System.as_str(), SYSTEM_INSTRUCTION));
    messages.extend(
        state
            .messages()
            .iter()
            .map(|m| RequestMessage::new(m.role.as_str(), &m.content)),
    );
    if continuation {
        messages.push(RequestMessage::new(Role::User.as_str(), CONTINUE_PROMPT));
    }

    let ChatSettings {
        model,
        max_tokens,
        temperature,
    } = &state.settings;

    ChatRequest {
        model: model.clone(),
        messages,
        max_tokens: *max_tokens,
        temperature: *temperature,
        top_p: 1.0,
        stream: false,
    }
}

pub struct Orchestrator {
    state: ConversationState,
    gateway: Arc<dyn ApiGateway>,
    templates: Arc<dyn TemplateService>,
    context_id: String,
}

impl Orchestrator {
    pub fn new(
        settings: ChatSettings,
        context_id: impl Into<String>,
        gateway: Arc<dyn ApiGateway>,
        templates: Arc<dyn TemplateService>,
    ) -> Self {
        Self {
            state: ConversationState::new(settings),
            gateway,
            templates,
            context_id: context_id.into(),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Shared handle to the gateway, for running a [`PendingReply`] elsewhere.
    pub fn gateway(&self) -> Arc<dyn ApiGateway> {
        Arc::clone(&self.gateway)
    }

    /// Record the question and mark the conversation busy.
    ///
    /// Returns `None` without touching state when a request is already outstanding,
    /// when `text` is empty for a new question, or when a continuation is requested
    /// but the last turn is not a truncated model reply.
    pub fn begin_submit(&mut self, text: &str, continuation: bool) -> Option<PendingReply> {
        if self.state.is_busy() {
            tracing::debug!("submission dropped: a reply is still pending");
            return None;
        }
        if continuation {
            if !self.state.can_continue() {
                tracing::debug!("continuation dropped: last turn is not a truncated reply");
                return None;
            }
        } else if text.is_empty() {
            return None;
        }

        if !continuation {
            self.state.push_user(text);
            self.state.pending_input.clear();
        }
        self.state.set_busy(true);

        let request = build_request(&self.state, continuation);
        match serde_json::to_string(&request) {
            Ok(body) => {
                tracing::info!(
                    gateway = self.gateway.name(),
                    model = %request.model,
                    messages = request.messages.len(),
                    continuation,
                    "sending chat request"
                );
                Some(PendingReply { body, continuation })
            }
            Err(e) => {
                self.fail(&CompanionError::from(e));
                self.state.set_busy(false);
                None
            }
        }
    }

    /// Apply the gateway's answer for `pending` and return to idle.
    pub fn finish_reply(&mut self, pending: PendingReply, outcome: Result<GatewayEnvelope>) {
        let reply = outcome
            .and_then(GatewayEnvelope::into_completion)
            .and_then(Completion::into_reply);

        match reply {
            Ok(reply) => {
                tracing::info!(more = reply.more, chars = reply.text.len(), "reply received");
                if pending.continuation {
                    if !self.state.extend_last_reply(&reply.text, reply.more) {
                        self.state.push_reply(reply.text, reply.more);
                    }
                } else {
                    self.state.push_reply(reply.text, reply.more);
                }
            }
            Err(e) => self.fail(&e),
        }

        self.state.set_busy(false);
    }

    /// Send a question (or a continuation) and wait for the reply.
    pub async fn submit_user_message(&mut self, text: &str, continuation: bool) {
        let Some(pending) = self.begin_submit(text, continuation) else {
            return;
        };
        let outcome = self.gateway.send(pending.body()).await;
        self.finish_reply(pending, outcome);
    }

    /// Expand a template into the draft. Does not submit.
    pub async fn select_question_template(&mut self, key: &str) {
        if self.state.is_busy() {
            return;
        }
        self.state.selected_template = Some(key.to_string());

        match self.templates.expand_template(&self.context_id, key).await {
            Ok(text) => self.state.pending_input = text,
            Err(e) => self.fail(&e),
        }
    }

    /// Fetch the template labels offered for `context_id`.
    pub async fn load_available_templates(&mut self, context_id: &str) {
        if self.state.is_busy() {
            return;
        }
        self.context_id = context_id.to_string();

        match self.templates.list_templates(context_id).await {
            Ok(labels) => {
                tracing::debug!(count = labels.len(), "question templates loaded");
                self.state.templates = labels;
            }
            Err(e) => self.fail(&e),
        }
    }

    pub fn clear(&mut self) {
        if self.state.is_busy() {
            return;
        }
        self.state.clear();
    }

    /// Update the draft. Ignored while a reply is pending.
    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        if !self.state.is_busy() {
            self.state.pending_input = text.into();
        }
    }

    pub async fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Submit(text) => self.submit_user_message(&text, false).await,
            UiEvent::ContinueRequested => self.submit_user_message("", true).await,
            UiEvent::TemplateSelected(key) => self.select_question_template(&key).await,
            UiEvent::ClearRequested => self.clear(),
            UiEvent::InputChanged(text) => self.set_pending_input(text),
        }
    }

    fn fail(&mut self, err: &CompanionError) {
        tracing::warn!(error = %err, "conversation request failed");
        self.state.push_reply(format_error_turn(err), false);
    }
}

//! API gateway wire types and clients.
//!
//! A gateway takes a serialized chat request and answers with an envelope
//! `{isSuccess, response, message}` where `response` is the JSON-encoded completion.

pub mod openai;
pub mod proxy;

pub use openai::OpenAIGateway;
pub use proxy::ProxyGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CompanionError, ErrorDetail, Result};

/// Finish reason of a reply that ended naturally.
pub const STOP_REASON: &str = "stop";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: String,
    pub content: String,
}

impl RequestMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<RequestMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stream: bool,
}

/// What every gateway hands back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEnvelope {
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GatewayEnvelope {
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            is_success: true,
            response: Some(response.into()),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            response: None,
            message: Some(message.into()),
        }
    }

    /// Unwrap the completion, turning a reported failure into an error.
    pub fn into_completion(self) -> Result<Completion> {
        if !self.is_success {
            let detail = match self.message.as_deref().filter(|m| !m.is_empty()) {
                Some(message) => ErrorDetail::message(message),
                None => ErrorDetail::raw(serde_json::to_string(&self)?),
            };
            return Err(CompanionError::rejected("api gateway", detail));
        }

        let payload = self
            .response
            .ok_or_else(|| CompanionError::malformed("gateway envelope", "missing response payload"))?;

        serde_json::from_str(&payload).map_err(|e| CompanionError::malformed("completion", e))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// The part of a completion the conversation keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub more: bool,
}

impl Completion {
    /// First choice, trimmed. Anything but a natural stop means there is more.
    pub fn into_reply(self) -> Result<Reply> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompanionError::malformed("completion", "no choices returned"))?;

        Ok(Reply {
            text: choice.message.content.unwrap_or_default().trim().to_string(),
            more: choice.finish_reason.as_deref() != Some(STOP_REASON),
        })
    }
}

#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Forward a serialized [`ChatRequest`] to the completion endpoint.
    async fn send(&self, body: &str) -> Result<GatewayEnvelope>;

    fn name(&self) -> &'static str;
}

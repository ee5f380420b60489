use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ApiGateway, GatewayEnvelope};
use crate::error::{CompanionError, Result};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
}

/// Talks to an OpenAI-compatible endpoint directly and wraps the outcome in the
/// same envelope a server-side proxy would return.
#[derive(Clone)]
pub struct OpenAIGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIGateway {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompanionError::transport("openai", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ApiGateway for OpenAIGateway {
    async fn send(&self, body: &str) -> Result<GatewayEnvelope> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| CompanionError::transport("openai", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompanionError::transport("openai", e))?;

        if !status.is_success() {
            tracing::warn!(%status, "OpenAI API returned an error");
            let message = serde_json::from_str::<OpenAIErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("OpenAI API error {}: {}", status, text));
            return Ok(GatewayEnvelope::failure(message));
        }

        Ok(GatewayEnvelope::success(text))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

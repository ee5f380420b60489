use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{ApiGateway, GatewayEnvelope};
use crate::error::{CompanionError, ErrorDetail, Result};

#[derive(Serialize)]
struct ProxyRequest<'a> {
    body: &'a str,
}

/// Client for a server-side proxy that holds the model credentials.
///
/// The proxy receives `{ "body": <chat request JSON> }` and answers with a
/// [`GatewayEnvelope`]. A non-2xx status carries an error body instead.
#[derive(Clone)]
pub struct ProxyGateway {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ProxyGateway {
    pub fn new(endpoint: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompanionError::transport("api gateway", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_string),
        })
    }
}

#[async_trait]
impl ApiGateway for ProxyGateway {
    async fn send(&self, body: &str) -> Result<GatewayEnvelope> {
        let mut request = self.client.post(&self.endpoint).json(&ProxyRequest { body });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CompanionError::transport("api gateway", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompanionError::transport("api gateway", e))?;

        if !status.is_success() {
            tracing::warn!(%status, "API gateway returned an error status");
            let mut detail = ErrorDetail::from_body(&text);
            if detail.message.is_none() {
                detail = ErrorDetail::raw(format!("API gateway error {}: {}", status, text));
            }
            return Err(CompanionError::rejected("api gateway", detail));
        }

        serde_json::from_str(&text).map_err(|e| CompanionError::malformed("gateway envelope", e))
    }

    fn name(&self) -> &'static str {
        "proxy"
    }
}

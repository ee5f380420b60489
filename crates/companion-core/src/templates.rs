//! Question template service clients.
//!
//! A template is a canned question label; expanding it produces the full text the
//! user reviews before sending.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{CompanionError, ErrorDetail, Result};

/// Placeholder replaced by the context id in static template bodies.
pub const CONTEXT_PLACEHOLDER: &str = "{contextId}";

#[async_trait]
pub trait TemplateService: Send + Sync {
    async fn list_templates(&self, context_id: &str) -> Result<Vec<String>>;

    async fn expand_template(&self, context_id: &str, key: &str) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    context_id: &'a str,
    question: &'a str,
}

/// Template service reached over HTTP.
#[derive(Clone)]
pub struct HttpTemplateService {
    client: Client,
    base_url: String,
}

impl HttpTemplateService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompanionError::transport("template service", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &'static str,
    ) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompanionError::transport("template service", e))?;

        if !status.is_success() {
            return Err(CompanionError::rejected(
                "template service",
                ErrorDetail::from_body(&text),
            ));
        }

        serde_json::from_str(&text).map_err(|e| CompanionError::malformed(what, e))
    }
}

#[async_trait]
impl TemplateService for HttpTemplateService {
    async fn list_templates(&self, context_id: &str) -> Result<Vec<String>> {
        let url = format!("{}/questions", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("contextId", context_id)])
            .send()
            .await
            .map_err(|e| CompanionError::transport("template service", e))?;

        Self::read_json(response, "template list").await
    }

    async fn expand_template(&self, context_id: &str, key: &str) -> Result<String> {
        let url = format!("{}/questions/process", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ProcessRequest {
                context_id,
                question: key,
            })
            .send()
            .await
            .map_err(|e| CompanionError::transport("template service", e))?;

        Self::read_json(response, "expanded question").await
    }
}

/// Templates kept in configuration, label to body.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateService {
    templates: BTreeMap<String, String>,
}

impl StaticTemplateService {
    pub fn new(templates: BTreeMap<String, String>) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl TemplateService for StaticTemplateService {
    async fn list_templates(&self, _context_id: &str) -> Result<Vec<String>> {
        Ok(self.templates.keys().cloned().collect())
    }

    async fn expand_template(&self, context_id: &str, key: &str) -> Result<String> {
        self.templates
            .get(key)
            .map(|body| body.replace(CONTEXT_PLACEHOLDER, context_id))
            .ok_or_else(|| {
                CompanionError::rejected(
                    "template service",
                    ErrorDetail::message(format!("Unknown question template: {}", key)),
                )
            })
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::gateway::openai::OPENAI_BASE_URL;
use crate::gateway::{ApiGateway, OpenAIGateway, ProxyGateway};
use crate::provider::Provider;
use crate::state::{ChatSettings, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::templates::{HttpTemplateService, StaticTemplateService, TemplateService};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub gateway_url: Option<String>,
    pub api_key: Option<String>,
    pub template_service_url: Option<String>,
    pub templates: BTreeMap<String, String>,
    pub context_id: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub username: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Proxy.as_str().to_string()),
            gateway_url: None,
            api_key: None,
            template_service_url: None,
            templates: BTreeMap::new(),
            context_id: None,
            model: None,
            max_tokens: None,
            temperature: None,
            username: None,
            timeout_secs: None,
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment variables win over the file.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("COMPANION_GATEWAY") {
            self.provider = Some(provider);
        }
        if let Some(url) = var("COMPANION_GATEWAY_URL") {
            self.gateway_url = Some(url);
        }
        if let Some(model) = var("COMPANION_MODEL") {
            self.model = Some(model);
        }
        if self.api_key.is_none() {
            self.api_key = var("OPENAI_API_KEY");
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("devops-companion"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or_default()
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            model: self
                .model
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn context_id(&self) -> String {
        self.context_id.clone().unwrap_or_default()
    }

    /// Display name for the user's turns.
    pub fn display_name(&self) -> String {
        self.display_name_with(|key| std::env::var(key).ok())
    }

    fn display_name_with(&self, var: impl Fn(&str) -> Option<String>) -> String {
        let non_empty = |name: &String| !name.is_empty();
        self.username
            .clone()
            .filter(non_empty)
            .or_else(|| var("USER").filter(non_empty))
            .or_else(|| var("USERNAME").filter(non_empty))
            .unwrap_or_else(|| "You".to_string())
    }

    pub fn build_gateway(&self) -> Result<Arc<dyn ApiGateway>> {
        let timeout = self.timeout();
        match self.provider() {
            Provider::Proxy => {
                let url = self
                    .gateway_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("gateway_url is required for the proxy gateway"))?;
                Ok(Arc::new(ProxyGateway::new(url, self.api_key.as_deref(), timeout)?))
            }
            Provider::OpenAI => {
                let key = self
                    .api_key
                    .as_deref()
                    .ok_or_else(|| anyhow!("OpenAI API key not configured (set OPENAI_API_KEY)"))?;
                let base_url = self.gateway_url.as_deref().unwrap_or(OPENAI_BASE_URL);
                Ok(Arc::new(OpenAIGateway::new(base_url, key, timeout)?))
            }
        }
    }

    pub fn build_template_service(&self) -> Result<Arc<dyn TemplateService>> {
        match self.template_service_url.as_deref() {
            Some(url) => Ok(Arc::new(HttpTemplateService::new(url, self.timeout())?)),
            None => Ok(Arc::new(StaticTemplateService::new(self.templates.clone()))),
        }
    }
}

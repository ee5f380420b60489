pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod orchestrator;
pub mod provider;
pub mod state;
pub mod templates;

// Re-export main types for convenience
pub use config::Config;
pub use error::{format_error_turn, CompanionError, ErrorDetail, ERROR_PREFIX};
pub use events::UiEvent;
pub use gateway::{ApiGateway, ChatRequest, GatewayEnvelope, OpenAIGateway, ProxyGateway};
pub use orchestrator::{Orchestrator, PendingReply};
pub use provider::Provider;
pub use state::{ChatSettings, ConversationState, Message, Role};
pub use templates::{HttpTemplateService, StaticTemplateService, TemplateService};

//! Error model shared by the gateway, the template service and the orchestrator.
//!
//! Nothing here is fatal to a conversation: the orchestrator turns every error into
//! a chat turn via [`format_error_turn`].

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Marker every error turn starts with.
pub const ERROR_PREFIX: &str = "* There was an error: ";

/// Human-readable detail pulled out of a collaborator's error payload.
///
/// Gateways and template services built on an application platform answer failures
/// with `{message, exceptionType, stackTrace}`. Anything else ends up in `raw`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub exception_type: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    #[serde(skip)]
    pub raw: Option<String>,
}

impl ErrorDetail {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::default()
        }
    }

    /// Decode an error body, keeping the raw text when it carries no message.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<ErrorDetail>(body) {
            Ok(detail) if detail.message.as_deref().is_some_and(|m| !m.is_empty()) => detail,
            _ => Self::raw(body),
        }
    }

    /// Message, classification and trace on separate lines, or the raw text.
    pub fn render(&self) -> String {
        match self.message.as_deref().filter(|m| !m.is_empty()) {
            Some(message) => {
                let mut parts = vec![message];
                parts.extend(
                    [self.exception_type.as_deref(), self.stack_trace.as_deref()]
                        .into_iter()
                        .flatten()
                        .filter(|part| !part.is_empty()),
                );
                parts.join("\n")
            }
            None => self
                .raw
                .clone()
                .filter(|raw| !raw.is_empty())
                .unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Error)]
pub enum CompanionError {
    /// The request never produced a usable HTTP exchange.
    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The collaborator answered but reported failure.
    #[error("{service} rejected the request: {detail}")]
    Rejected {
        service: &'static str,
        detail: ErrorDetail,
    },

    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompanionError>;

impl CompanionError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    pub fn rejected(service: &'static str, detail: ErrorDetail) -> Self {
        Self::Rejected { service, detail }
    }

    pub fn malformed(what: &'static str, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            what,
            reason: reason.to_string(),
        }
    }

    /// The most specific text available for showing to the user.
    pub fn user_detail(&self) -> String {
        match self {
            Self::Rejected { detail, .. } => detail.render(),
            Self::Transport { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

/// Content of the chat turn that reports `err`.
pub fn format_error_turn(err: &CompanionError) -> String {
    format!("{}{}", ERROR_PREFIX, err.user_detail())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detail_with_message_joins_present_parts() {
        let detail = ErrorDetail::from_body(
            r#"{"message":"Read timed out","exceptionType":"System.CalloutException","stackTrace":"Class.OpenAiApiService: line 12"}"#,
        );
        assert_eq!(
            detail.render(),
            "Read timed out\nSystem.CalloutException\nClass.OpenAiApiService: line 12"
        );
    }

    #[test]
    fn detail_skips_missing_classification() {
        let detail = ErrorDetail::from_body(r#"{"message":"rate limited"}"#);
        assert_eq!(detail.render(), "rate limited");
    }

    #[test]
    fn detail_without_message_falls_back_to_raw_body() {
        let detail = ErrorDetail::from_body("<html>502 Bad Gateway</html>");
        assert_eq!(detail.render(), "<html>502 Bad Gateway</html>");

        let detail = ErrorDetail::from_body(r#"{"code":42}"#);
        assert_eq!(detail.render(), r#"{"code":42}"#);
    }

    #[test]
    fn empty_detail_still_renders_something() {
        assert_eq!(ErrorDetail::default().render(), "unknown error");
    }

    #[test]
    fn error_turn_carries_prefix_and_detail() {
        let err = CompanionError::rejected("api gateway", ErrorDetail::message("rate limited"));
        let turn = format_error_turn(&err);
        assert!(turn.starts_with(ERROR_PREFIX));
        assert!(turn.contains("rate limited"));
    }

    #[test]
    fn malformed_error_names_what_failed() {
        let err = CompanionError::malformed("completion", "no choices returned");
        assert_eq!(
            format_error_turn(&err),
            "* There was an error: malformed completion: no choices returned"
        );
    }
}

//! Model provider: an OpenAI-compatible Chat Completions client and the
//! event stream the agent consumes.

pub mod openai;

use std::fmt;

use futures_util::stream::BoxStream;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Non-success status or a failed request
    HttpStatus,
    /// Connect or request timeout
    Timeout,
    /// Unreadable SSE or JSON
    Parse,
    /// Error object sent inside the stream
    ApiError,
}

/// Provider failure with a one-line message and optional raw details.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Error for a non-success response. The body's `error.message` is
    /// lifted into the summary when present; the raw body becomes details.
    pub fn http_status(status: u16, body: &str) -> Self {
        let api_message = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            json.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let message = match api_message {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind: ProviderErrorKind::HttpStatus,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    pub fn api_error(code: &str, message: &str) -> Self {
        Self::new(ProviderErrorKind::ApiError, format!("{code}: {message}"))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One step of a streamed model reply.
///
/// Tool calls are addressed by `slot`, the position the provider gave the
/// call within the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCallStarted {
        slot: usize,
        id: String,
        name: String,
    },
    ToolCallArguments {
        slot: usize,
        fragment: String,
    },
    /// Last event of a reply that did not fail.
    Finished { finish_reason: String, usage: Usage },
    /// Error object inside the stream. Nothing follows it.
    Failed { code: String, message: String },
}

pub type ProviderStream = BoxStream<'static, Result<StreamEvent, ProviderError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_uses_api_message() {
        let err = ProviderError::http_status(401, r#"{"error":{"message":"bad key"}}"#);
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.to_string(), "HTTP 401: bad key");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_plain_and_empty_bodies() {
        let plain = ProviderError::http_status(502, "upstream down");
        assert_eq!(plain.message, "HTTP 502");
        assert_eq!(plain.details.as_deref(), Some("upstream down"));

        let empty = ProviderError::http_status(500, "");
        assert_eq!(empty.message, "HTTP 500");
        assert_eq!(empty.details, None);
    }
}

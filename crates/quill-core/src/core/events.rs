//! What an agent turn reports while it runs.
//!
//! Frontends (the TUI and `quill exec`) consume `AgentEvent`s; the model
//! receives `ToolOutput` envelopes.

use std::fmt;

use serde_json::{Value, json};

use crate::conversation::ChatMessage;
use crate::providers::ProviderErrorKind;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    TurnStarted,

    /// Streamed assistant text. Sent best-effort and may be dropped.
    AssistantDelta { text: String },

    /// Full assistant text of one model round.
    AssistantCompleted { text: String },

    /// The model opened a tool call; arguments are still streaming.
    ToolRequested { id: String, name: String },

    /// Growing preview of the text a document tool is about to write.
    ToolInputDelta {
        id: String,
        name: String,
        delta: String,
    },

    /// Arguments of a tool call are complete (`{}` when unparseable).
    ToolInputCompleted {
        id: String,
        name: String,
        input: Value,
    },

    ToolStarted { id: String, name: String },

    ToolCompleted { id: String, result: ToolOutput },

    /// The document revision moved during this turn.
    DocumentUpdated { content: String, revision: u64 },

    /// The turn failed. Nothing follows except the channel closing.
    Error {
        kind: ErrorKind,
        message: String,
        details: Option<String>,
    },

    /// The user cancelled the turn.
    Interrupted { partial_content: Option<String> },

    /// The turn ended, normally or by interruption; `messages` is the new history.
    TurnCompleted {
        final_text: String,
        messages: Vec<ChatMessage>,
    },

    UsageUpdate {
        input_tokens: u64,
        output_tokens: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    HttpStatus,
    Timeout,
    Parse,
    ApiError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Parse => "parse",
            ErrorKind::ApiError => "api_error",
            ErrorKind::Internal => "internal",
        }
    }
}

impl From<ProviderErrorKind> for ErrorKind {
    fn from(kind: ProviderErrorKind) -> Self {
        match kind {
            ProviderErrorKind::HttpStatus => ErrorKind::HttpStatus,
            ProviderErrorKind::Timeout => ErrorKind::Timeout,
            ProviderErrorKind::Parse => ErrorKind::Parse,
            ProviderErrorKind::ApiError => ErrorKind::ApiError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CANCELED_CODE: &str = "canceled";

/// Result of one tool call.
///
/// Sent to the model as a JSON envelope:
/// `{"ok": true, "data": ...}` or
/// `{"ok": false, "error": {"code", "message", "details"?}}`.
/// A canceled call uses the failure shape with code `canceled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Success(Value),
    Failure(ToolFailure),
    Canceled(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ToolOutput {
    pub fn success(data: Value) -> Self {
        ToolOutput::Success(data)
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        ToolOutput::Failure(ToolFailure {
            code: code.into(),
            message: message.into(),
            details: None,
        })
    }

    /// Attaches details to a failure; other outputs are returned unchanged.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        if let ToolOutput::Failure(failure) = &mut self {
            failure.details = Some(details.into());
        }
        self
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        ToolOutput::Canceled(message.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutput::Success(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ToolOutput::Success(data) => Some(data),
            ToolOutput::Failure(_) | ToolOutput::Canceled(_) => None,
        }
    }

    /// Error code and message of a failed or canceled call.
    pub fn error_summary(&self) -> Option<(&str, &str)> {
        match self {
            ToolOutput::Success(_) => None,
            ToolOutput::Failure(failure) => Some((&failure.code, &failure.message)),
            ToolOutput::Canceled(message) => Some((CANCELED_CODE, message)),
        }
    }

    pub fn envelope(&self) -> Value {
        match self {
            ToolOutput::Success(data) => json!({ "ok": true, "data": data }),
            ToolOutput::Failure(failure) => {
                let mut error = json!({ "code": failure.code, "message": failure.message });
                if let Some(details) = &failure.details {
                    error["details"] = Value::String(details.clone());
                }
                json!({ "ok": false, "error": error })
            }
            ToolOutput::Canceled(message) => json!({
                "ok": false,
                "error": { "code": CANCELED_CODE, "message": message },
            }),
        }
    }

    /// The envelope as the text of a tool message.
    pub fn to_json_string(&self) -> String {
        self.envelope().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let output = ToolOutput::success(json!({"revision": 3, "bytes": 12}));
        assert_eq!(
            output.envelope(),
            json!({"ok": true, "data": {"revision": 3, "bytes": 12}})
        );
    }

    #[test]
    fn test_failure_envelope_only_lists_present_details() {
        let bare = ToolOutput::failure("text_not_found", "Text not found");
        assert_eq!(
            bare.envelope(),
            json!({"ok": false, "error": {"code": "text_not_found", "message": "Text not found"}})
        );

        let detailed = bare.with_details("looked for 'x'");
        assert_eq!(detailed.envelope()["error"]["details"], "looked for 'x'");
    }

    #[test]
    fn test_canceled_uses_failure_shape() {
        let output = ToolOutput::canceled("Interrupted by user");
        let value: Value = serde_json::from_str(&output.to_json_string()).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], "canceled");
        assert_eq!(output.error_summary(), Some(("canceled", "Interrupted by user")));
    }

    #[test]
    fn test_with_details_ignores_success() {
        let output = ToolOutput::success(Value::Null).with_details("unused");
        assert_eq!(output, ToolOutput::Success(Value::Null));
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::from(ProviderErrorKind::HttpStatus).to_string(), "http_status");
        assert_eq!(ErrorKind::Internal.to_string(), "internal");
    }
}

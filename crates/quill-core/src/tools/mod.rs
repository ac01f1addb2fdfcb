//! Document tools the model can call.
//!
//! Each tool is a definition (name, description, JSON schema) plus a
//! synchronous executor that edits the shared document. The registry runs
//! executors on the blocking pool.

pub mod append_to_document;
pub mod replace_text;
pub mod update_document;

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::events::ToolOutput;
use crate::document::{EditError, SharedDocument};

/// Tool definition sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone)]
pub struct ToolContext {
    pub document: SharedDocument,
    /// Upper bound for one call; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ToolContext {
    pub fn new(document: SharedDocument, timeout: Option<Duration>) -> Self {
        Self { document, timeout }
    }
}

type Executor = fn(&Value, &ToolContext) -> ToolOutput;

/// The tools offered to the model, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    executors: HashMap<String, Executor>,
}

impl ToolRegistry {
    /// Registry with `update_document`, `append_to_document` and
    /// `replace_text`, in that order.
    pub fn builtins() -> Self {
        let mut registry = Self::default();
        registry.register(update_document::definition(), update_document::execute);
        registry.register(append_to_document::definition(), append_to_document::execute);
        registry.register(replace_text::definition(), replace_text::execute);
        registry
    }

    /// Adds a tool, replacing any tool with the same name.
    pub fn register(&mut self, definition: ToolDefinition, executor: Executor) {
        let key = definition.name.to_ascii_lowercase();
        self.definitions
            .retain(|existing| !existing.name.eq_ignore_ascii_case(&key));
        self.definitions.push(definition);
        self.executors.insert(key, executor);
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Runs a tool by name (case-insensitive). Unknown names answer with an
    /// `unknown_tool` failure listing the registered tools.
    pub async fn execute(&self, name: &str, input: &Value, ctx: &ToolContext) -> ToolOutput {
        let Some(&executor) = self.executors.get(&name.to_ascii_lowercase()) else {
            let mut known: Vec<&str> = self.definitions.iter().map(|d| d.name.as_str()).collect();
            known.sort_unstable();
            return ToolOutput::failure("unknown_tool", format!("Unknown tool: {name}"))
                .with_details(format!("Available tools: {}", known.join(", ")));
        };

        let input = input.clone();
        let task_ctx = ctx.clone();
        let output = run_blocking(ctx.timeout, move || executor(&input, &task_ctx)).await;
        tracing::debug!(tool = name, ok = output.is_ok(), "tool executed");
        output
    }
}

/// Deserializes tool arguments, answering `invalid_input` on mismatch.
pub(crate) fn parse_input<T: DeserializeOwned>(tool: &str, input: &Value) -> Result<T, ToolOutput> {
    T::deserialize(input).map_err(|err| {
        ToolOutput::failure("invalid_input", format!("Invalid input for {tool} tool"))
            .with_details(format!("Parse error: {err}"))
    })
}

pub(crate) fn edit_failure(err: &EditError) -> ToolOutput {
    ToolOutput::failure(err.code(), err.to_string())
}

async fn run_blocking<F>(limit: Option<Duration>, job: F) -> ToolOutput
where
    F: FnOnce() -> ToolOutput + Send + 'static,
{
    let mut handle = tokio::task::spawn_blocking(job);
    let joined = match limit {
        None => handle.await,
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return ToolOutput::failure(
                    "timeout",
                    format!("Tool execution timed out after {} seconds", limit.as_secs()),
                );
            }
        },
    };
    joined.unwrap_or_else(|err| {
        tracing::error!(error = %err, "tool task failed");
        ToolOutput::failure("panic", "Tool execution panicked").with_details(err.to_string())
    })
}

//! System prompt assembly.

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::document::Document;

/// Prompt template for system prompt assembly (`MiniJinja`).
pub const SYSTEM_PROMPT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/system_prompt_template.md"
));

#[derive(Debug, Serialize)]
struct ToolSummary {
    name: &'static str,
    purpose: &'static str,
}

const TOOL_SUMMARIES: [ToolSummary; 3] = [
    ToolSummary {
        name: "update_document",
        purpose: "rewrite the whole document",
    },
    ToolSummary {
        name: "append_to_document",
        purpose: "add content at the end",
    },
    ToolSummary {
        name: "replace_text",
        purpose: "replace specific parts of the text",
    },
];

#[derive(Debug, Serialize)]
struct PromptTemplateVars<'a> {
    title: String,
    revision: u64,
    document: &'a str,
    language: &'a str,
    tools: &'a [ToolSummary],
    extra_instructions: Option<&'a str>,
}

/// Renders the system prompt around a snapshot of `document`.
///
/// # Errors
/// Returns an error if the template fails to render.
pub fn build_system_prompt(
    language: &str,
    document: &Document,
    extra_instructions: Option<&str>,
) -> Result<String> {
    let vars = PromptTemplateVars {
        title: document.title(),
        revision: document.revision(),
        document: document.content(),
        language: if language.trim().is_empty() {
            "English"
        } else {
            language.trim()
        },
        tools: &TOOL_SUMMARIES,
        extra_instructions: extra_instructions
            .map(str::trim)
            .filter(|s| !s.is_empty()),
    };
    render_prompt_template(SYSTEM_PROMPT_TEMPLATE, &vars)
}

fn render_prompt_template(template: &str, vars: &PromptTemplateVars<'_>) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template("system_prompt", template)
        .context("Failed to parse system prompt template")?;

    let output = env
        .get_template("system_prompt")
        .and_then(|tmpl| tmpl.render(vars))
        .context("Failed to render system prompt template")?;

    Ok(output.replace("\r\n", "\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_document_in_markdown_fence() {
        let doc = Document::new("# Notes\n\nhello");
        let prompt = build_system_prompt("English", &doc, None).unwrap();
        assert!(prompt.contains("```markdown\n# Notes\n\nhello\n```"));
        assert!(prompt.contains("(Notes, revision 0)"));
        assert!(prompt.contains("Always answer in English."));
    }

    #[test]
    fn test_prompt_lists_every_tool() {
        let prompt = build_system_prompt("English", &Document::new(""), None).unwrap();
        for name in ["update_document", "append_to_document", "replace_text"] {
            assert!(prompt.contains(&format!("- {name}:")), "missing {name}");
        }
    }

    #[test]
    fn test_prompt_uses_configured_language() {
        let prompt = build_system_prompt("Italian", &Document::new(""), None).unwrap();
        assert!(prompt.contains("Always answer in Italian."));
    }

    #[test]
    fn test_prompt_appends_extra_instructions() {
        let doc = Document::new("x");
        let prompt = build_system_prompt("English", &doc, Some("  Keep it short.  ")).unwrap();
        assert!(prompt.ends_with("Keep it short."));

        let blank = build_system_prompt("English", &doc, Some("   ")).unwrap();
        assert!(blank.ends_with("Always answer in English."));
    }

    #[test]
    fn test_document_with_template_syntax_is_not_evaluated() {
        let doc = Document::new("{{ not_a_var }} {% if %}");
        let prompt = build_system_prompt("English", &doc, None).unwrap();
        assert!(prompt.contains("{{ not_a_var }} {% if %}"));
    }
}

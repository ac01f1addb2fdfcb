//! The markdown document edited by the agent.
//!
//! One document per session. Edits are applied through `Document::apply`,
//! which bumps `revision` only when the content actually changes. The tools
//! and the agent loop share it through `SharedDocument`.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Starting content for a fresh document.
pub const DEFAULT_MARKDOWN: &str = "# Document

Welcome! This is a shared markdown document.

Ask the assistant to change it, for example:
- add a section about a topic
- rewrite the introduction
- replace a word everywhere
";

/// Fallback title when the document has no level-1 heading.
const DEFAULT_TITLE: &str = "Document";

/// A single edit requested by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DocumentEdit {
    /// Replace the whole document.
    Replace { new_content: String },
    /// Append a block after the current content, separated by a blank line.
    Append { content_to_add: String },
    /// Replace every occurrence of `old_text` with `new_text`.
    ReplaceText { old_text: String, new_text: String },
}

/// Result of an applied edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub revision: u64,
    pub bytes: usize,
    /// Number of replaced occurrences (`ReplaceText` only).
    pub replacements: usize,
}

/// Rejected edit. The document is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    EmptyContent,
    EmptyOldText,
    TextNotFound { old_text: String },
}

impl EditError {
    /// Stable error code used in tool envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::EmptyContent => "empty_content",
            EditError::EmptyOldText => "empty_old_text",
            EditError::TextNotFound { .. } => "text_not_found",
        }
    }
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::EmptyContent => write!(f, "Content must not be empty"),
            EditError::EmptyOldText => write!(f, "Text to replace must not be empty"),
            EditError::TextNotFound { old_text } => {
                write!(f, "Text not found in document: '{old_text}'")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// The markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    content: String,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_MARKDOWN)
    }
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            revision: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Text of the first `# ` heading, or a generic title.
    pub fn title(&self) -> String {
        self.content
            .lines()
            .find_map(|line| line.strip_prefix("# "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string()
    }

    /// Applies an edit. An accepted edit that leaves the text as it was
    /// keeps the current revision.
    ///
    /// # Errors
    /// Returns an `EditError` when the edit is rejected; content and
    /// revision are unchanged in that case.
    pub fn apply(&mut self, edit: &DocumentEdit) -> Result<EditOutcome, EditError> {
        let (next, replacements) = match edit {
            DocumentEdit::Replace { new_content } => {
                if new_content.is_empty() {
                    return Err(EditError::EmptyContent);
                }
                (new_content.clone(), 0)
            }
            DocumentEdit::Append { content_to_add } => {
                if content_to_add.is_empty() {
                    return Err(EditError::EmptyContent);
                }
                (
                    format!("{}\n\n{content_to_add}", self.content.trim_end()),
                    0,
                )
            }
            DocumentEdit::ReplaceText { old_text, new_text } => {
                if old_text.is_empty() {
                    return Err(EditError::EmptyOldText);
                }
                let count = self.content.matches(old_text.as_str()).count();
                if count == 0 {
                    return Err(EditError::TextNotFound {
                        old_text: old_text.clone(),
                    });
                }
                (self.content.replace(old_text.as_str(), new_text), count)
            }
        };

        if next != self.content {
            self.content = next;
            self.revision += 1;
        }
        Ok(EditOutcome {
            revision: self.revision,
            bytes: self.content.len(),
            replacements,
        })
    }

    /// Loads a document from disk, falling back to the default content when
    /// the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "document missing, using default");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read document from {}", path.display()))?;
        Ok(Self::new(content))
    }

    /// Writes the document atomically.
    ///
    /// # Errors
    /// Returns an error if the parent directory or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomically(path, &self.content)
            .with_context(|| format!("Failed to save document to {}", path.display()))?;
        tracing::debug!(path = %path.display(), revision = self.revision, "document saved");
        Ok(())
    }
}

/// Writes through a temp file in the target directory, then renames it
/// over `path`. Missing parent directories are created.
pub(crate) fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Document handle shared between the agent loop and tool handlers.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument(Arc<RwLock<Document>>);

impl SharedDocument {
    pub fn new(document: Document) -> Self {
        Self(Arc::new(RwLock::new(document)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clones the current state out of the lock.
    pub fn snapshot(&self) -> Document {
        self.read().clone()
    }

    pub fn revision(&self) -> u64 {
        self.read().revision()
    }

    /// Applies an edit under the write lock.
    ///
    /// # Errors
    /// See `Document::apply`.
    pub fn apply(&self, edit: &DocumentEdit) -> Result<EditOutcome, EditError> {
        self.write().apply(edit)
    }

    /// Replaces the whole document, keeping the revision monotonic.
    pub fn reset(&self, content: impl Into<String>) {
        let mut doc = self.write();
        let revision = doc.revision + 1;
        *doc = Document {
            content: content.into(),
            revision,
        };
    }
}

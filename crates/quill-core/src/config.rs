//! Quill settings, read from `$QUILL_HOME/config.toml`.
//!
//! Every key is optional. The commented template in `default_config.toml`
//! is what `quill config init` writes, and edits made by Quill itself are
//! laid over that template so the comments survive.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item, Table};

use crate::document::write_atomically;

const TEMPLATE: &str = include_str!("../default_config.toml");

pub mod paths {
    //! Where Quill keeps its files.
    //!
    //! `QUILL_HOME` when set, else `~/.config/quill`, else `./.quill`.

    use std::path::PathBuf;

    pub fn quill_home() -> PathBuf {
        match std::env::var("QUILL_HOME") {
            Ok(home) if !home.trim().is_empty() => PathBuf::from(home),
            _ => dirs::home_dir().map_or_else(
                || PathBuf::from(".quill"),
                |home| home.join(".config").join("quill"),
            ),
        }
    }

    pub fn config_path() -> PathBuf {
        quill_home().join("config.toml")
    }

    pub fn document_path() -> PathBuf {
        quill_home().join("document.md")
    }

    pub fn logs_dir() -> PathBuf {
        quill_home().join("logs")
    }
}

/// Which markdown renderer draws the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// pulldown-cmark backed
    #[default]
    Rich,
    /// One block per line, no inline markup
    Simple,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Markdown file. Empty means `$QUILL_HOME/document.md`.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub side_panel: bool,
    /// Below this width the document is shown inline instead.
    pub min_panel_width: u16,
    pub panel_ratio_percent: u16,
    pub renderer: RendererKind,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            side_panel: true,
            min_panel_width: 40,
            panel_ratio_percent: 45,
            renderer: RendererKind::Rich,
        }
    }
}

/// `[providers.openai]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl OpenAiConfig {
    /// The configured key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    /// The configured endpoint, ignoring blank values.
    pub fn base_url(&self) -> Option<&str> {
        non_blank(self.base_url.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    /// Unset or 0 sends the default limit.
    pub max_tokens: Option<u32>,
    pub temperature: f64,
    /// Language the assistant answers in.
    pub language: String,
    /// Extra instructions appended to the system prompt.
    pub system_prompt: Option<String>,
    /// File with extra instructions. Wins over `system_prompt`.
    pub system_prompt_file: Option<String>,
    /// 0 disables the limit.
    pub tool_timeout_secs: u32,
    pub providers: ProvidersConfig,
    pub document: DocumentConfig,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
            temperature: 0.7,
            language: "English".to_string(),
            system_prompt: None,
            system_prompt_file: None,
            tool_timeout_secs: 0,
            providers: ProvidersConfig::default(),
            document: DocumentConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;

    /// # Errors
    /// The config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Reads `path`, or returns the defaults when it does not exist.
    ///
    /// # Errors
    /// The file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read config from {}", path.display()));
            }
        };
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Writes the template to `path`.
    ///
    /// # Errors
    /// A file is already there, or it cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }
        write_atomically(path, TEMPLATE)
    }

    /// The template with its values replaced by `Config::default()`.
    ///
    /// `cargo xtask update-default-config` uses this to keep
    /// `default_config.toml` honest.
    ///
    /// # Errors
    /// The defaults fail to serialize or the template fails to parse.
    pub fn generate() -> Result<String> {
        let defaults =
            toml::to_string(&Config::default()).context("Failed to serialize default config")?;
        overlay_on_template(&defaults)
    }

    /// Stores `document.path` in the config at `path`, keeping the user's
    /// other settings and the template's comments.
    ///
    /// # Errors
    /// The existing file cannot be read or parsed, or the result cannot be written.
    pub fn save_document_path_to(path: &Path, document_path: &str) -> Result<()> {
        let base = match fs::read_to_string(path) {
            Ok(existing) => overlay_on_template(&existing)?,
            Err(err) if err.kind() == ErrorKind::NotFound => TEMPLATE.to_string(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read config from {}", path.display()));
            }
        };
        let mut doc: DocumentMut = base
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let section = doc.entry("document").or_insert(Item::Table(Table::new()));
        section["path"] = toml_edit::value(document_path);

        write_atomically(path, &doc.to_string())
    }

    /// Extra instructions for the system prompt: the file when configured,
    /// else the inline text. Blank text counts as none.
    ///
    /// # Errors
    /// `system_prompt_file` is set but cannot be read.
    pub fn effective_system_prompt(&self) -> Result<Option<String>> {
        let text = match &self.system_prompt_file {
            Some(file) => fs::read_to_string(file)
                .with_context(|| format!("Failed to read system prompt file: {file}"))?,
            None => self.system_prompt.clone().unwrap_or_default(),
        };
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0)
            .then(|| Duration::from_secs(u64::from(self.tool_timeout_secs)))
    }

    pub fn effective_max_tokens(&self) -> u32 {
        match self.max_tokens {
            Some(limit) if limit > 0 => limit,
            _ => Self::DEFAULT_MAX_TOKENS,
        }
    }

    /// `[document] path` when set, else `$QUILL_HOME/document.md`.
    pub fn document_path(&self) -> PathBuf {
        match self.document.path.trim() {
            "" => paths::document_path(),
            configured => PathBuf::from(configured),
        }
    }
}

/// Lays the values of `toml_text` over the template.
fn overlay_on_template(toml_text: &str) -> Result<String> {
    let mut template: DocumentMut =
        TEMPLATE.parse().context("Failed to parse config template")?;
    let values: DocumentMut = toml_text.parse().context("Failed to parse config")?;
    overlay(template.as_table_mut(), values.as_table());
    Ok(template.to_string())
}

/// Copies every value of `top` into `base`, descending into tables both
/// sides have so that `base`'s comments on untouched keys stay.
fn overlay(base: &mut Table, top: &Table) {
    for (key, item) in top {
        match (base.get_mut(key), item) {
            (_, Item::None) => {}
            (Some(Item::Table(base_table)), Item::Table(top_table)) => {
                overlay(base_table, top_table);
            }
            _ => {
                base.insert(key, item.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, None);
        assert_eq!(config.effective_max_tokens(), 4096);
        assert_eq!(config.language, "English");
        assert!(config.ui.side_panel);
        assert_eq!(config.ui.renderer, RendererKind::Rich);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = \"gpt-4.1\"\n[ui]\nrenderer = \"simple\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.ui.renderer, RendererKind::Simple);
        assert_eq!(config.ui.panel_ratio_percent, 45);
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_template_matches_defaults() {
        let config: Config = toml::from_str(TEMPLATE).unwrap();
        let defaults = Config::default();
        assert_eq!(config.model, defaults.model);
        assert_eq!(config.ui.min_panel_width, defaults.ui.min_panel_width);
        assert!((config.temperature - defaults.temperature).abs() < f64::EPSILON);
    }

    #[test]
    fn test_init_writes_template_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subdir").join("config.toml");

        Config::init(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("gpt-4o-mini"));
        assert!(contents.contains("# max_tokens ="));

        let err = Config::init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_prompt_file_wins_over_inline() {
        let dir = tempdir().unwrap();
        let prompt_file = dir.path().join("prompt.txt");
        fs::write(&prompt_file, "file prompt\n").unwrap();

        let config = Config {
            system_prompt_file: Some(prompt_file.to_string_lossy().into_owned()),
            system_prompt: Some("inline prompt".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.effective_system_prompt().unwrap().as_deref(),
            Some("file prompt")
        );
    }

    #[test]
    fn test_blank_prompt_is_none() {
        let config = Config {
            system_prompt: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_system_prompt().unwrap(), None);
    }

    #[test]
    fn test_zero_disables_tool_timeout() {
        assert_eq!(Config::default().tool_timeout(), None);
        let config = Config {
            tool_timeout_secs: 5,
            ..Default::default()
        };
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_max_tokens_uses_default() {
        let config = Config {
            max_tokens: Some(0),
            ..Default::default()
        };
        assert_eq!(config.effective_max_tokens(), Config::DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_blank_openai_values_are_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[providers.openai]\nbase_url = \"  \"\napi_key = \" sk-1 \"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.providers.openai.base_url(), None);
        assert_eq!(config.providers.openai.api_key(), Some("sk-1"));
    }

    #[test]
    fn test_document_path_prefers_config() {
        let config = Config {
            document: DocumentConfig {
                path: " /tmp/notes.md ".to_string(),
            },
            ..Default::default()
        };
        assert_eq!(config.document_path(), PathBuf::from("/tmp/notes.md"));
    }

    #[test]
    fn test_save_document_path_keeps_user_values_and_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = \"gpt-4.1\"\n").unwrap();

        Config::save_document_path_to(&path, "/tmp/plan.md").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("# Markdown renderer"));
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.document.path, "/tmp/plan.md");
    }

    #[test]
    fn test_save_document_path_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh").join("config.toml");

        Config::save_document_path_to(&path, "/tmp/new.md").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.document.path, "/tmp/new.md");
        assert_eq!(config.model, "gpt-4o-mini");
    }

    #[test]
    fn test_generate_parses_back_to_defaults() {
        let generated = Config::generate().unwrap();
        let config: Config = toml::from_str(&generated).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(generated.contains("[ui]"));
        assert!(generated.contains("# Markdown renderer"));
    }
}

//! OpenAI-compatible Chat Completions client.
//!
//! Works against api.openai.com and any server speaking the same streaming
//! protocol (`OPENAI_BASE_URL`).

mod request;
mod sse;

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::config::Config;
use crate::conversation::ChatMessage;
use crate::providers::{ProviderError, ProviderErrorKind, ProviderStream};
use crate::tools::ToolDefinition;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const CLIENT_NAME: &str = concat!("quill/", env!("CARGO_PKG_VERSION"));

/// Everything a request needs besides the conversation.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ChatSettings {
    /// Reads settings from config and the process environment.
    ///
    /// The API key comes from `[providers.openai] api_key`, then
    /// `OPENAI_API_KEY`. The base URL comes from `OPENAI_BASE_URL`, then
    /// `[providers.openai] base_url`, then the public endpoint.
    ///
    /// # Errors
    /// Fails when no API key is available or the base URL does not parse.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    fn resolve(config: &Config, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| {
            env(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let openai = &config.providers.openai;

        let api_key = openai
            .api_key()
            .map(str::to_string)
            .or_else(|| lookup(API_KEY_ENV))
            .with_context(|| {
                format!("No API key available. Set {API_KEY_ENV} or api_key in [providers.openai].")
            })?;

        let base_url = match lookup(BASE_URL_ENV).or_else(|| openai.base_url().map(str::to_string)) {
            Some(url) => {
                url::Url::parse(&url).with_context(|| format!("Invalid OpenAI base URL: {url}"))?;
                url.trim_end_matches('/').to_string()
            }
            None => DEFAULT_BASE_URL.to_string(),
        };

        Ok(Self {
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.effective_max_tokens(),
            temperature: config.temperature,
        })
    }
}

pub struct ChatClient {
    settings: ChatSettings,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Posts the conversation and returns the reply as a stream of events.
    ///
    /// # Errors
    /// Transport failures and non-success statuses.
    pub async fn stream(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ProviderStream, ProviderError> {
        let url = format!("{}{CHAT_COMPLETIONS_PATH}", self.settings.base_url);
        let body = request::ChatRequest::new(&self.settings, system_prompt, history, tools);
        tracing::debug!(%url, model = %self.settings.model, messages = history.len(), "posting chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .header(ACCEPT, "text/event-stream")
            .header(USER_AGENT, CLIENT_NAME)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &body));
        }

        Ok(sse::decode(response.bytes_stream()))
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::new(ProviderErrorKind::Timeout, format!("Request timed out: {err}"))
    } else if err.is_connect() {
        ProviderError::new(ProviderErrorKind::Timeout, format!("Connection failed: {err}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_with(api_key: Option<&str>, base_url: Option<&str>) -> Config {
        let mut config = Config::default();
        config.providers.openai.api_key = api_key.map(str::to_string);
        config.providers.openai.base_url = base_url.map(str::to_string);
        config
    }

    #[test]
    fn test_config_key_wins_over_env() {
        let config = config_with(Some("  sk-config "), None);
        let settings = ChatSettings::resolve(&config, |_| Some("sk-env".to_string())).unwrap();
        assert_eq!(settings.api_key, "sk-config");
    }

    #[test]
    fn test_missing_key_names_env_var() {
        let err = ChatSettings::resolve(&config_with(None, None), no_env).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
        assert!(err.to_string().contains("[providers.openai]"));
    }

    #[test]
    fn test_env_base_url_wins_and_loses_trailing_slash() {
        let config = config_with(Some("sk"), Some("http://config.example/v1"));
        let settings = ChatSettings::resolve(&config, |name| {
            (name == BASE_URL_ENV).then(|| "http://localhost:8080/v1/".to_string())
        })
        .unwrap();
        assert_eq!(settings.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_base_url_defaults_and_validates() {
        let settings = ChatSettings::resolve(&config_with(Some("sk"), None), no_env).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);

        let err = ChatSettings::resolve(&config_with(Some("sk"), Some("not a url")), no_env);
        assert!(err.is_err());
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = config_with(Some("sk"), None);
        config.model = "gpt-4.1".to_string();
        config.max_tokens = Some(512);
        let settings = ChatSettings::resolve(&config, no_env).unwrap();
        assert_eq!(settings.model, "gpt-4.1");
        assert_eq!(settings.max_tokens, 512);
    }
}

//! API credentials
//!
//! Read from a JSON file kept out of the main configuration, with
//! environment variables filling any key the file leaves out.

use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the completion API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the Discord bot token
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";

#[derive(Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default, alias = "openAIKey", alias = "openai_key")]
    pub openai_api_key: Option<String>,

    #[serde(default, alias = "token")]
    pub discord_token: Option<String>,
}

impl Secrets {
    /// Load from `path` if it exists, then fall back to the process environment
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let secrets = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read secrets file {}", path.display()))?;
            Self::from_json(&content)
                .with_context(|| format!("failed to parse secrets file {}", path.display()))?
        } else {
            Self::default()
        };

        Ok(secrets.with_fallback(|name| std::env::var(name).ok()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Fill missing or blank keys from `lookup`
    pub fn with_fallback(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if is_blank(&self.openai_api_key) {
            self.openai_api_key = lookup(OPENAI_API_KEY_ENV);
        }
        if is_blank(&self.discord_token) {
            self.discord_token = lookup(DISCORD_TOKEN_ENV);
        }
        self
    }

    pub fn openai_api_key(&self) -> anyhow::Result<&str> {
        present(&self.openai_api_key)
            .ok_or_else(|| anyhow!("no completion API key: set openai_api_key or {OPENAI_API_KEY_ENV}"))
    }

    pub fn discord_token(&self) -> anyhow::Result<&str> {
        present(&self.discord_token)
            .ok_or_else(|| anyhow!("no Discord bot token: set token or {DISCORD_TOKEN_ENV}"))
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("discord_token", &self.discord_token.as_ref().map(|_| "***"))
            .finish()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    present(value).is_none()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

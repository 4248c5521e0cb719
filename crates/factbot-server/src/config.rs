//! Bot configuration

use crate::cli::Cli;
use anyhow::{bail, Context};
use factbot_classifiers::StagesConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration, read from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    /// Per-stage completion parameters and deadlines
    #[serde(default)]
    pub stages: StagesConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Secrets file path; `secrets.json` next to the process when unset
    #[serde(default)]
    pub secrets_path: Option<String>,
}

impl BotConfig {
    /// Load configuration from file and apply CLI overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::from_file(config_path)?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file, or return defaults when it does not exist
    pub fn from_file(config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = config_path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(mode) = cli.gateway {
            self.gateway.mode = mode;
        }
        if let Some(reset_every) = cli.reset_every {
            self.dispatcher.reset_every = reset_every;
        }
        if let Some(secrets) = &cli.secrets {
            self.secrets_path = Some(secrets.clone());
        }
    }

    /// Reject settings the dispatcher cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dispatcher.reset_every == 0 {
            bail!("dispatcher.reset_every must be at least 1");
        }
        for (name, stage) in [
            ("validity", &self.stages.validity),
            ("accuracy", &self.stages.accuracy),
        ] {
            if stage.timeout_ms == 0 || stage.reload_timeout_ms == 0 {
                bail!("stages.{name}: timeouts must be greater than zero");
            }
        }
        if self.completion.model.trim().is_empty() {
            bail!("completion.model must not be empty");
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.listen, self.server.port)
    }

    pub fn secrets_path(&self) -> &str {
        self.secrets_path.as_deref().unwrap_or("secrets.json")
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted inbound message body (bytes)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// OpenAI-compatible completion backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_url(),
            model: default_model(),
        }
    }
}

/// Dispatcher pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Dequeues between context resets
    #[serde(default = "default_reset_every")]
    pub reset_every: u64,

    /// Pause before a timed-out message goes back on the queue (milliseconds)
    #[serde(default = "default_requeue_delay_ms")]
    pub requeue_delay_ms: u64,

    /// Time a moderation reply stays up before the original is deleted (milliseconds)
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,

    /// Interval at which a waiting reset reports a stalled drain (milliseconds)
    #[serde(default = "default_drain_warn_interval_ms")]
    pub drain_warn_interval_ms: u64,
}

impl DispatcherConfig {
    pub fn requeue_delay(&self) -> Duration {
        Duration::from_millis(self.requeue_delay_ms)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    pub fn drain_warn_interval(&self) -> Duration {
        Duration::from_millis(self.drain_warn_interval_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            reset_every: default_reset_every(),
            requeue_delay_ms: default_requeue_delay_ms(),
            grace_delay_ms: default_grace_delay_ms(),
            drain_warn_interval_ms: default_drain_warn_interval_ms(),
        }
    }
}

/// Outbound chat gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,

    /// Discord REST API base URL
    #[serde(default = "default_discord_url")]
    pub api_base: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::default(),
            api_base: default_discord_url(),
        }
    }
}

/// Where moderation actions are sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatewayMode {
    /// Discord REST API
    Discord,
    /// Log actions without sending them
    #[default]
    DryRun,
}

impl FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discord" => Ok(Self::Discord),
            "dry-run" | "dry_run" | "dryrun" => Ok(Self::DryRun),
            other => Err(format!(
                "unknown gateway '{other}', expected 'discord' or 'dry-run'"
            )),
        }
    }
}

impl fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discord => write!(f, "discord"),
            Self::DryRun => write!(f, "dry-run"),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_reset_every() -> u64 {
    10
}

fn default_requeue_delay_ms() -> u64 {
    250
}

fn default_grace_delay_ms() -> u64 {
    3_000
}

fn default_drain_warn_interval_ms() -> u64 {
    5_000
}

fn default_discord_url() -> String {
    "https://discord.com/api/v10".to_string()
}

//! Per-stage call settings

use factbot_core::{CompletionRequest, Exchange};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Completion parameters and deadlines for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
    /// Sampling temperature for classification calls
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Token ceiling per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Deadline for live classification calls (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for each warm-up attempt during reload (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub reload_timeout_ms: u64,

    /// Pause between failed warm-up attempts (milliseconds)
    #[serde(default = "default_reload_retry_delay_ms")]
    pub reload_retry_delay_ms: u64,
}

impl StageSettings {
    /// Defaults for the validity stage (longer warm-up deadline)
    pub fn validity() -> Self {
        Self {
            reload_timeout_ms: 60_000,
            ..Self::default()
        }
    }

    /// Defaults for the accuracy stage
    pub fn accuracy() -> Self {
        Self::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_millis(self.reload_timeout_ms)
    }

    pub fn reload_retry_delay(&self) -> Duration {
        Duration::from_millis(self.reload_retry_delay_ms)
    }

    /// Build a live classification request
    pub fn classify_request(&self, messages: Vec<Exchange>) -> CompletionRequest {
        CompletionRequest::new(messages, self.timeout())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Build a warm-up request issued during reload
    pub fn reload_request(&self, messages: Vec<Exchange>) -> CompletionRequest {
        CompletionRequest::new(messages, self.reload_timeout())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
            reload_timeout_ms: default_timeout_ms(),
            reload_retry_delay_ms: default_reload_retry_delay_ms(),
        }
    }
}

/// Settings for both stages of the chain.
///
/// A partial stage block keeps that stage's own defaults for the fields it
/// leaves out, so overriding only `validity.temperature` still leaves the
/// longer validity warm-up deadline in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(
        default = "StageSettings::validity",
        deserialize_with = "validity_settings"
    )]
    pub validity: StageSettings,

    #[serde(
        default = "StageSettings::accuracy",
        deserialize_with = "accuracy_settings"
    )]
    pub accuracy: StageSettings,
}

/// Fields present in a stage block
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StageOverrides {
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_ms: Option<u64>,
    reload_timeout_ms: Option<u64>,
    reload_retry_delay_ms: Option<u64>,
}

impl StageOverrides {
    fn apply(self, base: StageSettings) -> StageSettings {
        StageSettings {
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            reload_timeout_ms: self.reload_timeout_ms.unwrap_or(base.reload_timeout_ms),
            reload_retry_delay_ms: self
                .reload_retry_delay_ms
                .unwrap_or(base.reload_retry_delay_ms),
        }
    }
}

fn validity_settings<'de, D>(deserializer: D) -> Result<StageSettings, D::Error>
where
    D: Deserializer<'de>,
{
    StageOverrides::deserialize(deserializer).map(|o| o.apply(StageSettings::validity()))
}

fn accuracy_settings<'de, D>(deserializer: D) -> Result<StageSettings, D::Error>
where
    D: Deserializer<'de>,
{
    StageOverrides::deserialize(deserializer).map(|o| o.apply(StageSettings::accuracy()))
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            validity: StageSettings::validity(),
            accuracy: StageSettings::accuracy(),
        }
    }
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_reload_retry_delay_ms() -> u64 {
    1_000
}

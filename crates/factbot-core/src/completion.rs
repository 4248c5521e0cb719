//! Completion backend interface

use crate::error::Result;
use crate::types::Exchange;
use async_trait::async_trait;
use std::time::Duration;

/// A single chat completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered conversation, oldest first
    pub messages: Vec<Exchange>,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_tokens: u32,

    /// Deadline for the whole call
    pub deadline: Duration,
}

impl CompletionRequest {
    /// Create a request with the given messages and deadline
    pub fn new(messages: Vec<Exchange>, deadline: Duration) -> Self {
        Self {
            messages,
            temperature: 0.5,
            max_tokens: 2000,
            deadline,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token ceiling
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Remote service returning free-form text for a conversation.
///
/// Implementations should fail with [`Error::Timeout`](crate::Error::Timeout)
/// when the deadline passes and [`Error::Remote`](crate::Error::Remote) for
/// every other backend failure. Callers enforce the deadline on their side
/// as well, so an implementation that ignores it is still bounded.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run the completion and return the response text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

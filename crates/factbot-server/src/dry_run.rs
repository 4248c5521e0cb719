//! Gateway that logs moderation actions instead of sending them

use async_trait::async_trait;
use factbot_core::{ChatGateway, PendingMessage, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::info;

/// Most recent actions kept for inspection
const HISTORY_LIMIT: usize = 100;

/// One action the gateway would have taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GatewayAction {
    Reply { message_id: String, content: String },
    Delete { message_id: String },
}

#[derive(Default)]
pub struct LoggingGateway {
    history: Mutex<VecDeque<GatewayAction>>,
}

impl LoggingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions taken so far, oldest first
    pub fn actions(&self) -> Vec<GatewayAction> {
        self.history.lock().iter().cloned().collect()
    }

    fn record(&self, action: GatewayAction) {
        let mut history = self.history.lock();
        if history.len() == HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(action);
    }
}

#[async_trait]
impl ChatGateway for LoggingGateway {
    async fn reply(&self, message: &PendingMessage, content: &str) -> Result<()> {
        info!(
            message_id = %message.id,
            channel = %message.channel,
            content,
            "dry run: would reply"
        );
        self.record(GatewayAction::Reply {
            message_id: message.id.clone(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete(&self, message: &PendingMessage) -> Result<()> {
        info!(message_id = %message.id, channel = %message.channel, "dry run: would delete");
        self.record(GatewayAction::Delete {
            message_id: message.id.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

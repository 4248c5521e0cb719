//! Discord REST gateway
//!
//! Only the two outbound actions moderation needs: reply to a message and
//! delete it. Inbound messages arrive through the intake endpoint.

use async_trait::async_trait;
use factbot_core::{ChatGateway, Error, PendingMessage, Result};
use serde_json::json;
use tracing::debug;

/// Longest message body Discord accepts
const MAX_CONTENT_CHARS: usize = 2000;

pub struct DiscordGateway {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl DiscordGateway {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self, channel: &str) -> String {
        format!("{}/channels/{channel}/messages", self.base_url)
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".into());
        Err(Error::gateway(format!(
            "Discord {action} returned {status}: {body}"
        )))
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn reply(&self, message: &PendingMessage, content: &str) -> Result<()> {
        let body = json!({
            "content": truncate(content, MAX_CONTENT_CHARS),
            "message_reference": {
                "message_id": message.id,
                "channel_id": message.channel,
                "fail_if_not_exists": false,
            },
            "allowed_mentions": { "replied_user": false },
        });

        debug!(message_id = %message.id, channel = %message.channel, "sending reply");

        let response = self
            .http
            .post(self.messages_url(&message.channel))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::gateway(format!("reply failed: {e}")))?;

        Self::check(response, "reply").await
    }

    async fn delete(&self, message: &PendingMessage) -> Result<()> {
        let url = format!("{}/{}", self.messages_url(&message.channel), message.id);

        debug!(message_id = %message.id, channel = %message.channel, "deleting message");

        let response = self
            .http
            .delete(url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| Error::gateway(format!("delete failed: {e}")))?;

        Self::check(response, "delete").await
    }

    fn name(&self) -> &str {
        "discord"
    }
}

fn truncate(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

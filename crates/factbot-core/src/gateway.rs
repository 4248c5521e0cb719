//! Chat gateway interface

use crate::error::Result;
use crate::types::PendingMessage;
use async_trait::async_trait;

/// Outbound actions on the chat platform.
///
/// Each action is independently fallible. The pipeline does not retry
/// either of them; failures are logged and counted.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Post `content` in the message's channel as a reply to it
    async fn reply(&self, message: &PendingMessage, content: &str) -> Result<()>;

    /// Delete the original message
    async fn delete(&self, message: &PendingMessage) -> Result<()>;

    /// Gateway name for logs
    fn name(&self) -> &str;
}

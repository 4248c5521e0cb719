//! Unbounded intake queue between the gateway callback and the dispatcher

use factbot_core::{InboundMessage, PendingMessage};
use factbot_telemetry::ModerationMetrics;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receiving half, owned by the dispatcher
pub type QueueReceiver = mpsc::UnboundedReceiver<PendingMessage>;

/// Producer handle for the intake queue.
///
/// Cheap to clone. Enqueueing never blocks and never fails from the caller's
/// point of view; if the dispatcher has already shut down the message is
/// logged and dropped.
#[derive(Clone)]
pub struct IntakeQueue {
    sender: mpsc::UnboundedSender<PendingMessage>,
    metrics: ModerationMetrics,
}

impl IntakeQueue {
    /// Create a queue and its receiving half
    pub fn channel(metrics: ModerationMetrics) -> (Self, QueueReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender, metrics }, receiver)
    }

    /// Gateway callback for a newly posted message.
    ///
    /// Messages written by a bot, including this one, are discarded here so
    /// the bot never moderates its own replies.
    pub fn accept_message(&self, message: InboundMessage) -> Option<PendingMessage> {
        if message.author_is_bot {
            debug!(author = %message.author, "discarding bot-authored message");
            self.metrics.record_discarded();
            return None;
        }

        let pending = message.into_pending();
        debug!(
            message_id = %pending.id,
            author = %pending.author,
            channel = %pending.channel,
            "message queued"
        );
        self.metrics.record_accepted();
        self.push(pending.clone());
        Some(pending)
    }

    /// Put a message back on the queue unchanged
    pub fn requeue(&self, message: PendingMessage) {
        self.metrics.record_requeue();
        self.push(message);
    }

    fn push(&self, message: PendingMessage) {
        if let Err(mpsc::error::SendError(message)) = self.sender.send(message) {
            warn!(message_id = %message.id, "dispatcher stopped, message dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

//! Visible moderation actions
//!
//! A message that needs moderation gets a reply explaining why, stays up for
//! a short grace period so readers can connect the two, and is then deleted.
//! The reply and the delete are independent: either can fail without
//! stopping the other, and neither is retried.

use factbot_core::{ChatGateway, PendingMessage, Verdict, VerdictTag};
use factbot_telemetry::ModerationMetrics;
use std::time::Duration;
use tracing::{info, warn};

/// Text posted in reply to a moderated message
pub fn reply_text(verdict: &Verdict) -> String {
    let headline = match verdict.tag {
        VerdictTag::Harmful => "This message has been removed because it may be harmful.",
        VerdictTag::ContainsMisinformation => {
            "This message has been removed because it contains misinformation."
        }
        _ => "This message has been flagged by moderation.",
    };

    if verdict.reason.trim().is_empty() {
        headline.to_string()
    } else {
        format!("{headline}\nReason: {}", verdict.reason.trim())
    }
}

/// Reply, wait `grace_delay`, delete
pub async fn enforce(
    gateway: &dyn ChatGateway,
    metrics: &ModerationMetrics,
    grace_delay: Duration,
    message: &PendingMessage,
    verdict: &Verdict,
) {
    info!(
        message_id = %message.id,
        author = %message.author,
        channel = %message.channel,
        tag = %verdict.tag,
        "moderating message"
    );

    let replied = match gateway.reply(message, &reply_text(verdict)).await {
        Ok(()) => true,
        Err(err) => {
            warn!(message_id = %message.id, gateway = gateway.name(), error = %err, "moderation reply failed");
            false
        }
    };
    metrics.record_action("reply", replied);

    tokio::time::sleep(grace_delay).await;

    let deleted = match gateway.delete(message).await {
        Ok(()) => true,
        Err(err) => {
            warn!(message_id = %message.id, gateway = gateway.name(), error = %err, "message delete failed");
            false
        }
    };
    metrics.record_action("delete", deleted);
    metrics.record_moderation();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text_includes_reason() {
        let verdict = Verdict::new(
            VerdictTag::ContainsMisinformation,
            "The earth is an oblate spheroid.",
        );
        let text = reply_text(&verdict);

        assert!(text.contains("misinformation"));
        assert!(text.ends_with("Reason: The earth is an oblate spheroid."));
    }

    #[test]
    fn test_reply_text_without_reason() {
        let text = reply_text(&Verdict::new(VerdictTag::Harmful, "  "));
        assert_eq!(text, "This message has been removed because it may be harmful.");
    }
}

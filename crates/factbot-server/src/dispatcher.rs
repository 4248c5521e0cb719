//! Message dispatcher
//!
//! A single loop takes messages off the intake queue and hands each one to
//! its own task. Message tasks are not bounded or ordered; a slow or
//! panicking task affects nothing but its own message. Every
//! `reset_every` dequeues the loop also starts a context reset on a
//! separate task.
//!
//! Requeued messages are dequeued again and count toward `reset_every`.
//! A message retrying through a long reload can therefore make the next
//! reset due as soon as the current one finishes.

use crate::context::ModerationContext;
use crate::moderation;
use crate::queue::{IntakeQueue, QueueReceiver};
use factbot_classifiers::ResetOutcome;
use factbot_core::{PendingMessage, VerdictTag};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Dispatcher {
    ctx: Arc<ModerationContext>,
    queue: IntakeQueue,
    receiver: QueueReceiver,
}

impl Dispatcher {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        let (queue, receiver) = IntakeQueue::channel(ctx.metrics.clone());
        Self {
            ctx,
            queue,
            receiver,
        }
    }

    /// Producer handle for the gateway callback
    pub fn queue(&self) -> IntakeQueue {
        self.queue.clone()
    }

    pub fn context(&self) -> Arc<ModerationContext> {
        Arc::clone(&self.ctx)
    }

    /// Run the loop on its own task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Drain the queue until `shutdown` is cancelled.
    ///
    /// Tasks already spawned keep running after the loop exits.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let reset_every = self.ctx.settings.reset_every.max(1);
        info!(reset_every, "dispatcher started");

        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break,
                message = self.receiver.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            let dequeued = self.ctx.metrics.record_dequeued();
            tokio::spawn(handle_message(
                Arc::clone(&self.ctx),
                self.queue.clone(),
                message,
            ));

            if dequeued % reset_every == 0 {
                self.ctx.metrics.record_reset_triggered();
                tokio::spawn(run_reset(Arc::clone(&self.ctx), dequeued));
            }
        }

        info!("dispatcher stopped");
    }
}

/// Classify one message and act on the verdict
async fn handle_message(ctx: Arc<ModerationContext>, queue: IntakeQueue, message: PendingMessage) {
    let start = Instant::now();
    let verdict = ctx.classify(&message.text).await;

    match verdict.tag {
        VerdictTag::Timeout => {
            debug!(message_id = %message.id, reason = %verdict.reason, "classification timed out, requeueing");
            let delay = ctx.settings.requeue_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            queue.requeue(message);
        }
        tag => {
            ctx.metrics
                .record_classification(start.elapsed().as_micros() as u64);

            if tag.requires_moderation() {
                moderation::enforce(
                    ctx.gateway.as_ref(),
                    &ctx.metrics,
                    ctx.settings.grace_delay(),
                    &message,
                    &verdict,
                )
                .await;
            } else {
                debug!(message_id = %message.id, tag = %tag, reason = %verdict.reason, "no action");
            }
        }
    }
}

async fn run_reset(ctx: Arc<ModerationContext>, dequeued: u64) {
    debug!(dequeued, "context reset due");
    if ctx.reset().await == ResetOutcome::AlreadyRunning {
        debug!(dequeued, "previous reset still running, skipped");
    }
}

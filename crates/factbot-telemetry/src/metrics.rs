//! Metrics collection and reporting

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metric names recorded through the `metrics` facade
pub mod names {
    /// Messages accepted into the intake queue
    pub const MESSAGES_TOTAL: &str = "factbot_messages_total";
    /// Verdicts per stage and tag
    pub const VERDICTS_TOTAL: &str = "factbot_verdicts_total";
    /// Responses whose leading tag was not in the stage vocabulary
    pub const MALFORMED_RESPONSES_TOTAL: &str = "factbot_malformed_responses_total";
    /// Non-timeout failures from the completion backend
    pub const REMOTE_ERRORS_TOTAL: &str = "factbot_remote_errors_total";
    /// Stage call latency
    pub const CLASSIFICATION_LATENCY_US: &str = "factbot_classification_latency_us";
    /// Messages re-enqueued after a timeout verdict
    pub const REQUEUES_TOTAL: &str = "factbot_requeues_total";
    /// Reply and delete actions by outcome
    pub const MODERATION_ACTIONS_TOTAL: &str = "factbot_moderation_actions_total";
    /// Completed drain-and-reload cycles
    pub const RESETS_TOTAL: &str = "factbot_resets_total";
    /// Warm-up attempts issued while reloading a stage
    pub const RELOAD_ATTEMPTS_TOTAL: &str = "factbot_reload_attempts_total";
    /// Classification calls currently admitted
    pub const GATE_IN_FLIGHT: &str = "factbot_gate_in_flight";
    /// 1 while a reset blocks admissions
    pub const GATE_RESETTING: &str = "factbot_gate_resetting";
    /// 1 while a reset has waited longer than the stall interval
    pub const GATE_DRAIN_STALLED: &str = "factbot_gate_drain_stalled";
}

/// Register descriptions for every FactBot metric with the installed recorder
pub fn describe_metrics() {
    use ::metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

    describe_counter!(names::MESSAGES_TOTAL, "Total number of messages accepted for moderation");
    describe_counter!(names::VERDICTS_TOTAL, "Classification verdicts by stage and tag");
    describe_counter!(
        names::MALFORMED_RESPONSES_TOTAL,
        "Completion responses with an unrecognised leading tag"
    );
    describe_counter!(names::REMOTE_ERRORS_TOTAL, "Non-timeout completion backend failures");
    describe_histogram!(
        names::CLASSIFICATION_LATENCY_US,
        Unit::Microseconds,
        "Stage classification latency in microseconds"
    );
    describe_counter!(names::REQUEUES_TOTAL, "Messages re-enqueued after a timeout");
    describe_counter!(
        names::MODERATION_ACTIONS_TOTAL,
        "Gateway moderation actions by action and outcome"
    );
    describe_counter!(names::RESETS_TOTAL, "Completed conversation context resets");
    describe_counter!(names::RELOAD_ATTEMPTS_TOTAL, "Warm-up calls issued during stage reload");
    describe_gauge!(names::GATE_IN_FLIGHT, "Classification calls currently in flight");
    describe_gauge!(names::GATE_RESETTING, "Whether a reset currently blocks admissions");
    describe_gauge!(
        names::GATE_DRAIN_STALLED,
        "Whether a reset has been waiting on in-flight calls past the stall interval"
    );
}

/// In-process counters for the moderation dispatcher
#[derive(Clone)]
pub struct ModerationMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    messages_accepted: AtomicU64,
    messages_discarded: AtomicU64,
    messages_dequeued: AtomicU64,
    classifications: AtomicU64,
    requeues: AtomicU64,
    moderations: AtomicU64,
    gateway_failures: AtomicU64,
    resets_triggered: AtomicU64,
    classification_latency_us: AtomicU64,
}

impl ModerationMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record a message accepted into the queue
    pub fn record_accepted(&self) {
        self.inner.messages_accepted.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(names::MESSAGES_TOTAL).increment(1);
    }

    /// Record a self-authored message dropped at intake
    pub fn record_discarded(&self) {
        self.inner.messages_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dequeue; returns the running dequeue count
    pub fn record_dequeued(&self) -> u64 {
        self.inner.messages_dequeued.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a finished chain classification
    pub fn record_classification(&self, latency_us: u64) {
        self.inner.classifications.fetch_add(1, Ordering::Relaxed);
        self.inner
            .classification_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    /// Record a timed-out message going back on the queue
    pub fn record_requeue(&self) {
        self.inner.requeues.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(names::REQUEUES_TOTAL).increment(1);
    }

    /// Record a moderation action attempt
    pub fn record_action(&self, action: &'static str, succeeded: bool) {
        if !succeeded {
            self.inner.gateway_failures.fetch_add(1, Ordering::Relaxed);
        }
        let outcome = if succeeded { "ok" } else { "failed" };
        ::metrics::counter!(names::MODERATION_ACTIONS_TOTAL, "action" => action, "outcome" => outcome)
            .increment(1);
    }

    /// Record a message that received a moderation response
    pub fn record_moderation(&self) {
        self.inner.moderations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reset handed off to its own task
    pub fn record_reset_triggered(&self) {
        self.inner.resets_triggered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_accepted: self.inner.messages_accepted.load(Ordering::Relaxed),
            messages_discarded: self.inner.messages_discarded.load(Ordering::Relaxed),
            messages_dequeued: self.inner.messages_dequeued.load(Ordering::Relaxed),
            classifications: self.inner.classifications.load(Ordering::Relaxed),
            requeues: self.inner.requeues.load(Ordering::Relaxed),
            moderations: self.inner.moderations.load(Ordering::Relaxed),
            gateway_failures: self.inner.gateway_failures.load(Ordering::Relaxed),
            resets_triggered: self.inner.resets_triggered.load(Ordering::Relaxed),
            classification_latency_us: self
                .inner
                .classification_latency_us
                .load(Ordering::Relaxed),
        }
    }
}

impl Default for ModerationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub messages_accepted: u64,
    pub messages_discarded: u64,
    pub messages_dequeued: u64,
    pub classifications: u64,
    pub requeues: u64,
    pub moderations: u64,
    pub gateway_failures: u64,
    pub resets_triggered: u64,
    pub classification_latency_us: u64,
}

impl MetricsSnapshot {
    /// Calculate average chain latency per classification
    pub fn avg_classification_latency_us(&self) -> u64 {
        if self.classifications == 0 {
            0
        } else {
            self.classification_latency_us / self.classifications
        }
    }

    /// Fraction of classifications that ended in a moderation action
    pub fn moderation_rate(&self) -> f64 {
        if self.classifications == 0 {
            0.0
        } else {
            self.moderations as f64 / self.classifications as f64
        }
    }

    /// Messages accepted but not yet taken off the queue
    pub fn backlog(&self) -> u64 {
        (self.messages_accepted + self.requeues).saturating_sub(self.messages_dequeued)
    }
}

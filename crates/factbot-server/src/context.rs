//! Shared moderation state
//!
//! Everything a message task needs, built once at startup and shared behind
//! an `Arc`: the stage chain, the gate guarding its resets, the outbound
//! gateway, counters and dispatcher pacing.

use crate::config::{BotConfig, DispatcherConfig};
use factbot_classifiers::{
    ClassificationStage, GateStatus, QuiescenceGate, ResetOutcome, StageChain, StageProfile,
};
use factbot_core::{ChatGateway, CompletionClient, Verdict};
use factbot_telemetry::{MetricsSnapshot, ModerationMetrics};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub struct ModerationContext {
    pub chain: StageChain,
    pub gate: QuiescenceGate,
    pub gateway: Arc<dyn ChatGateway>,
    pub metrics: ModerationMetrics,
    pub settings: DispatcherConfig,
}

impl ModerationContext {
    pub fn new(
        chain: StageChain,
        gateway: Arc<dyn ChatGateway>,
        settings: DispatcherConfig,
    ) -> Self {
        Self {
            chain,
            gate: QuiescenceGate::with_drain_warn_interval(settings.drain_warn_interval()),
            gateway,
            metrics: ModerationMetrics::new(),
            settings,
        }
    }

    /// Build both stages over one completion client
    pub fn from_config(
        config: &BotConfig,
        client: Arc<dyn CompletionClient>,
        gateway: Arc<dyn ChatGateway>,
    ) -> Self {
        let validity = ClassificationStage::new(
            StageProfile::validity(),
            config.stages.validity.clone(),
            Arc::clone(&client),
        );
        let accuracy =
            ClassificationStage::new(StageProfile::accuracy(), config.stages.accuracy.clone(), client);

        Self::new(
            StageChain::new(validity, accuracy),
            gateway,
            config.dispatcher.clone(),
        )
    }

    /// Classify through the chain under a gate admission.
    ///
    /// While a reset is running no admission is granted and the message is
    /// reported as timed out so the dispatcher retries it later.
    pub async fn classify(&self, text: &str) -> Verdict {
        match self.gate.try_admit() {
            Some(_admission) => self.chain.classify(text).await,
            None => {
                debug!("gate closed for reset");
                Verdict::reset_in_progress()
            }
        }
    }

    /// Drain in-flight classifications, then reload both stages
    pub async fn reset(&self) -> ResetOutcome {
        let chain = &self.chain;
        self.gate.reset(move || chain.reload()).await
    }

    /// Warm both stages before taking traffic
    pub async fn warm_up(&self) {
        self.chain.reload().await;
    }

    pub fn stats(&self) -> ModerationStats {
        let metrics = self.metrics.snapshot();
        ModerationStats {
            gate: self.gate.status(),
            queue_depth: metrics.backlog(),
            metrics,
            validity_live_pairs: self.chain.validity().live_pairs(),
            accuracy_live_pairs: self.chain.accuracy().live_pairs(),
            context_generation: self.chain.validity().generation(),
        }
    }
}

/// Body of the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModerationStats {
    pub gate: GateStatus,
    /// Messages waiting on the intake queue
    pub queue_depth: u64,
    pub metrics: MetricsSnapshot,
    pub validity_live_pairs: usize,
    pub accuracy_live_pairs: usize,
    pub context_generation: u64,
}


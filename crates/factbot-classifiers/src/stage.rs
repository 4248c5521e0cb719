//! A single few-shot classification stage

use crate::profile::{StageKind, StageProfile};
use crate::settings::StageSettings;
use factbot_core::{CompletionClient, ConversationState, Error, Verdict};
use factbot_telemetry::metrics::names;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// LLM classifier with its own growing conversation context.
///
/// Every call works on a snapshot of the conversation, so concurrent callers
/// see the same base and only differ in their own trailing user turn. Live
/// history is appended under the write lock once a response arrives; a call
/// that times out or fails leaves the conversation untouched.
pub struct ClassificationStage {
    profile: StageProfile,
    settings: StageSettings,
    client: Arc<dyn CompletionClient>,
    conversation: RwLock<ConversationState>,
}

impl ClassificationStage {
    /// Create a stage seeded from its profile.
    ///
    /// No backend call is made here; call [`reload`](Self::reload) to warm the
    /// context before taking traffic.
    pub fn new(
        profile: StageProfile,
        settings: StageSettings,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        let conversation = RwLock::new(ConversationState::new(profile.seed()));
        Self {
            profile,
            settings,
            client,
            conversation,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.profile.kind()
    }

    pub fn profile(&self) -> &StageProfile {
        &self.profile
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// Number of exchanges in the live conversation
    pub fn conversation_len(&self) -> usize {
        self.conversation.read().len()
    }

    /// Number of live (user, assistant) pairs since the last reload
    pub fn live_pairs(&self) -> usize {
        self.conversation.read().live_pairs()
    }

    /// Reload counter of the current conversation
    pub fn generation(&self) -> u64 {
        self.conversation.read().generation()
    }

    /// Copy of the current conversation
    pub fn conversation(&self) -> ConversationState {
        self.conversation.read().clone()
    }

    /// Classify `text` against the current context
    pub async fn classify(&self, text: &str) -> Verdict {
        let start = Instant::now();
        let stage = self.kind().as_str();

        let snapshot = self.conversation.read().snapshot();
        let generation = snapshot.generation();
        let request = self
            .settings
            .classify_request(snapshot.with_user_turn(text));

        let outcome = tokio::time::timeout(self.settings.timeout(), self.client.complete(&request)).await;

        let verdict = match outcome {
            Err(_) => {
                debug!(stage, timeout_ms = self.settings.timeout_ms, "classification timed out");
                Verdict::timeout()
            }
            Ok(Err(err)) if err.is_retryable() => {
                debug!(stage, error = %err, "backend asked for a retry");
                match err {
                    Error::ResetInProgress => Verdict::reset_in_progress(),
                    _ => Verdict::timeout(),
                }
            }
            Ok(Err(err)) => {
                warn!(stage, backend = self.client.name(), error = %err, "completion call failed");
                metrics::counter!(names::REMOTE_ERRORS_TOTAL, "stage" => stage).increment(1);
                Verdict::new(self.profile.unsure_tag(), format!("completion failed: {err}"))
            }
            Ok(Ok(response)) => {
                let (verdict, malformed) = self.profile.interpret(&response);
                if malformed {
                    warn!(stage, response = %response, "unrecognised response tag, treating as unsure");
                    metrics::counter!(names::MALFORMED_RESPONSES_TOTAL, "stage" => stage).increment(1);
                }

                let appended = self
                    .conversation
                    .write()
                    .append_pair(generation, text, response);
                if !appended {
                    debug!(stage, generation, "context reloaded during call, live pair dropped");
                }

                verdict
            }
        };

        let latency_us = start.elapsed().as_micros() as u64;
        metrics::histogram!(names::CLASSIFICATION_LATENCY_US, "stage" => stage).record(latency_us as f64);
        metrics::counter!(names::VERDICTS_TOTAL, "stage" => stage, "tag" => verdict.tag.as_str())
            .increment(1);
        debug!(stage, tag = %verdict.tag, latency_us, "stage verdict");

        verdict
    }

    /// Replace the conversation with a fresh seed.
    ///
    /// A warm-up call against the seed alone is retried until the backend
    /// answers within the reload deadline; only then is the live history
    /// discarded. There is no attempt ceiling.
    pub async fn reload(&self) {
        let stage = self.kind().as_str();
        let seed = self.conversation.read().seed().to_vec();
        let request = self.settings.reload_request(seed);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            metrics::counter!(names::RELOAD_ATTEMPTS_TOTAL, "stage" => stage).increment(1);

            match tokio::time::timeout(self.settings.reload_timeout(), self.client.complete(&request))
                .await
            {
                Ok(Ok(_)) => break,
                Ok(Err(err)) => {
                    warn!(stage, attempt, error = %err, "warm-up call failed, retrying");
                }
                Err(_) => {
                    warn!(
                        stage,
                        attempt,
                        timeout_ms = self.settings.reload_timeout_ms,
                        "warm-up call timed out, retrying"
                    );
                }
            }

            tokio::time::sleep(self.settings.reload_retry_delay()).await;
        }

        let mut conversation = self.conversation.write();
        let discarded = conversation.live_pairs();
        let next = conversation.next_generation();
        *conversation = next;
        info!(
            stage,
            attempts = attempt,
            discarded_pairs = discarded,
            generation = conversation.generation(),
            "stage context reloaded"
        );
    }
}

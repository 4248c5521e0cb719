//! Scripted completion backend for stage and chain tests

#![allow(dead_code)]

use async_trait::async_trait;
use factbot_classifiers::{ClassificationStage, StageChain, StageProfile, StageSettings};
use factbot_core::{CompletionClient, CompletionRequest, Error, Result, Role};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the backend does for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Delayed(Duration, String),
    Hang,
    Fail(String),
    Busy,
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Which prompt a request was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Validity,
    Accuracy,
}

/// One observed request
#[derive(Debug, Clone)]
pub struct Call {
    pub target: Target,
    pub warm_up: bool,
    pub input: String,
    pub attempt: usize,
}

type Script = dyn Fn(&Call) -> Reply + Send + Sync;

/// Backend that answers from a script and counts calls per stage
pub struct ScriptedBackend {
    script: Box<Script>,
    validity_calls: AtomicUsize,
    accuracy_calls: AtomicUsize,
    warm_ups: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: impl Fn(&Call) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            validity_calls: AtomicUsize::new(0),
            accuracy_calls: AtomicUsize::new(0),
            warm_ups: AtomicUsize::new(0),
        }
    }

    /// Backend that knows a handful of facts
    pub fn knowledgeable() -> Self {
        Self::new(|call| match (call.target, call.warm_up) {
            (_, true) => Reply::text("READY"),
            (Target::Validity, false) => {
                if call.input == "asdogihaw" {
                    Reply::text("UNGRAMMATICAL: gibberish")
                } else if call.input.contains("hurt") {
                    Reply::text("HARMFUL: The message threatens violence.")
                } else {
                    Reply::text("GRAMMATICAL: A readable statement.")
                }
            }
            (Target::Accuracy, false) => {
                if call.input.contains("flat") {
                    Reply::text("MISINFORMATION: The earth is an oblate spheroid.")
                } else if call.input.contains("round") {
                    Reply::text("FACTUAL: The earth is very nearly spherical.")
                } else {
                    Reply::text("UNSURE")
                }
            }
        })
    }

    pub fn validity_calls(&self) -> usize {
        self.validity_calls.load(Ordering::SeqCst)
    }

    pub fn accuracy_calls(&self) -> usize {
        self.accuracy_calls.load(Ordering::SeqCst)
    }

    pub fn warm_ups(&self) -> usize {
        self.warm_ups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let preamble = request
            .messages
            .first()
            .map(|exchange| exchange.text().to_string())
            .unwrap_or_default();
        let target = if preamble.contains("MISINFORMATION") {
            Target::Accuracy
        } else {
            Target::Validity
        };
        let last = request
            .messages
            .last()
            .expect("request without messages");
        let warm_up = last.role() != Role::User;

        let attempt = if warm_up {
            self.warm_ups.fetch_add(1, Ordering::SeqCst)
        } else if target == Target::Validity {
            self.validity_calls.fetch_add(1, Ordering::SeqCst)
        } else {
            self.accuracy_calls.fetch_add(1, Ordering::SeqCst)
        };

        let call = Call {
            target,
            warm_up,
            input: last.text().to_string(),
            attempt,
        };

        match (self.script)(&call) {
            Reply::Text(text) => Ok(text),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Reply::Hang => {
                std::future::pending::<()>().await;
                Err(Error::Timeout)
            }
            Reply::Fail(message) => Err(Error::remote(message)),
            Reply::Busy => Err(Error::ResetInProgress),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Settings with short deadlines for tests
pub fn fast_settings() -> StageSettings {
    StageSettings {
        timeout_ms: 200,
        reload_timeout_ms: 200,
        reload_retry_delay_ms: 10,
        ..StageSettings::default()
    }
}

pub fn validity_stage(backend: &Arc<ScriptedBackend>) -> ClassificationStage {
    ClassificationStage::new(
        StageProfile::validity(),
        fast_settings(),
        Arc::clone(backend) as Arc<dyn CompletionClient>,
    )
}

pub fn accuracy_stage(backend: &Arc<ScriptedBackend>) -> ClassificationStage {
    ClassificationStage::new(
        StageProfile::accuracy(),
        fast_settings(),
        Arc::clone(backend) as Arc<dyn CompletionClient>,
    )
}

pub fn chain(backend: &Arc<ScriptedBackend>) -> StageChain {
    StageChain::new(validity_stage(backend), accuracy_stage(backend))
}

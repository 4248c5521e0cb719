//! Test doubles for the completion backend and the chat gateway

#![allow(dead_code)]

use async_trait::async_trait;
use factbot_classifiers::{StageSettings, StagesConfig};
use factbot_core::{
    ChatGateway, CompletionClient, CompletionRequest, Error, PendingMessage, Result, Role,
};
use factbot_server::{BotConfig, DispatcherConfig, ModerationContext};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Validity,
    Accuracy,
}

pub enum Reply {
    Text(&'static str),
    Delayed(Duration, &'static str),
    Hang,
    Panic,
}

type Script = dyn Fn(Target, bool, &str) -> Reply + Send + Sync;

/// Completion backend driven by a script of (stage, warm-up, input)
pub struct MockBackend {
    pub script: Box<Script>,
    validity_calls: AtomicUsize,
    accuracy_calls: AtomicUsize,
    warm_ups: AtomicUsize,
}

impl MockBackend {
    pub fn new(script: impl Fn(Target, bool, &str) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            validity_calls: AtomicUsize::new(0),
            accuracy_calls: AtomicUsize::new(0),
            warm_ups: AtomicUsize::new(0),
        }
    }

    pub fn knowledgeable() -> Self {
        Self::new(|target, warm_up, input| match (target, warm_up) {
            (_, true) => Reply::Text("READY"),
            (Target::Validity, false) => match input {
                "asdogihaw" => Reply::Text("UNGRAMMATICAL: gibberish"),
                "boom" => Reply::Panic,
                _ if input.contains("hurt") => Reply::Text("HARMFUL: threatens violence"),
                _ => Reply::Text("GRAMMATICAL"),
            },
            (Target::Accuracy, false) => {
                if input.contains("flat") {
                    Reply::Text("MISINFORMATION: The earth is an oblate spheroid.")
                } else {
                    Reply::Text("FACTUAL")
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
impl CompletionClient for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let target = match request.messages.first() {
            Some(preamble) if preamble.text().contains("MISINFORMATION") => Target::Accuracy,
            _ => Target::Validity,
        };
        let last = request.messages.last().expect("request without messages");
        let warm_up = last.role() != Role::User;

        let counter = match (warm_up, target) {
            (true, _) => &self.warm_ups,
            (false, Target::Validity) => &self.validity_calls,
            (false, Target::Accuracy) => &self.accuracy_calls,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        match (self.script)(target, warm_up, last.text()) {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text.to_string())
            }
            Reply::Hang => {
                std::future::pending::<()>().await;
                Err(Error::Timeout)
            }
            Reply::Panic => panic!("backend exploded"),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Gateway whose replies always fail; deletes are recorded
#[derive(Default)]
pub struct BrokenReplyGateway {
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatGateway for BrokenReplyGateway {
    async fn reply(&self, _message: &PendingMessage, _content: &str) -> Result<()> {
        Err(Error::gateway("Discord reply returned 403 Forbidden"))
    }

    async fn delete(&self, message: &PendingMessage) -> Result<()> {
        self.deleted.lock().push(message.id.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

pub fn dispatcher_settings() -> DispatcherConfig {
    DispatcherConfig {
        reset_every: 1_000,
        requeue_delay_ms: 50,
        ..DispatcherConfig::default()
    }
}

fn fast_stage() -> StageSettings {
    StageSettings {
        timeout_ms: 200,
        reload_timeout_ms: 200,
        reload_retry_delay_ms: 10,
        ..StageSettings::default()
    }
}

pub fn context(
    backend: &Arc<MockBackend>,
    gateway: Arc<dyn ChatGateway>,
    settings: DispatcherConfig,
) -> Arc<ModerationContext> {
    let config = BotConfig {
        stages: StagesConfig {
            validity: fast_stage(),
            accuracy: fast_stage(),
        },
        dispatcher: settings,
        ..BotConfig::default()
    };

    Arc::new(ModerationContext::from_config(
        &config,
        Arc::clone(backend) as Arc<dyn CompletionClient>,
        gateway,
    ))
}

/// Poll `condition` every 10ms of (possibly virtual) time
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 20s");
}

//! Dispatcher end to end: intake, classification, moderation and resets

mod common;

use common::{context, dispatcher_settings, eventually, BrokenReplyGateway, MockBackend, Reply};
use factbot_core::{ChatGateway, InboundMessage};
use factbot_server::{DispatcherConfig, Dispatcher, GatewayAction, LoggingGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn message(id: &str, text: &str) -> InboundMessage {
    InboundMessage::new("alice", "general", text).with_id(id)
}

#[tokio::test(start_paused = true)]
async fn test_true_statement_takes_no_action() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let gateway = Arc::new(LoggingGateway::new());
    let ctx = context(&backend, gateway.clone(), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "The earth is round"));
    eventually(|| ctx.metrics.snapshot().classifications == 1).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(gateway.actions().is_empty());
    assert_eq!(backend.validity_calls(), 1);
    assert_eq!(backend.accuracy_calls(), 1);
    assert_eq!(ctx.metrics.snapshot().moderations, 0);
}

#[tokio::test(start_paused = true)]
async fn test_false_statement_is_answered_then_deleted() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let gateway = Arc::new(LoggingGateway::new());
    let ctx = context(&backend, gateway.clone(), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "The earth is flat"));

    eventually(|| !gateway.actions().is_empty()).await;
    let replied_at = Instant::now();
    match &gateway.actions()[0] {
        GatewayAction::Reply {
            message_id,
            content,
        } => {
            assert_eq!(message_id, "m1");
            assert!(content.contains("The earth is an oblate spheroid."));
        }
        other => panic!("expected a reply first, got {other:?}"),
    }

    eventually(|| gateway.actions().len() == 2).await;
    assert!(replied_at.elapsed() >= Duration::from_millis(2_990));
    assert_eq!(
        gateway.actions()[1],
        GatewayAction::Delete {
            message_id: "m1".to_string()
        }
    );
    assert_eq!(ctx.metrics.snapshot().moderations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_harmful_message_is_moderated_without_accuracy() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let gateway = Arc::new(LoggingGateway::new());
    let ctx = context(&backend, gateway.clone(), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "I will hurt you"));

    eventually(|| gateway.actions().len() == 2).await;
    assert_eq!(backend.accuracy_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_gibberish_short_circuits_without_action() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let gateway = Arc::new(LoggingGateway::new());
    let ctx = context(&backend, gateway.clone(), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "asdogihaw"));
    eventually(|| ctx.metrics.snapshot().classifications == 1).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(gateway.actions().is_empty());
    assert_eq!(backend.validity_calls(), 1);
    assert_eq!(backend.accuracy_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_requeue_forever_and_loop_survives() {
    let backend = Arc::new(MockBackend::new(|_, _, _| Reply::Hang));
    let gateway = Arc::new(LoggingGateway::new());
    let ctx = context(&backend, gateway.clone(), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let handle = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "The earth is round"));

    eventually(|| ctx.metrics.snapshot().requeues >= 5).await;

    let stats = ctx.metrics.snapshot();
    assert!(stats.messages_dequeued >= 5);
    assert_eq!(stats.classifications, 0);
    assert!(gateway.actions().is_empty());
    assert_eq!(backend.accuracy_calls(), 0);
    assert!(!handle.is_finished());
    assert_eq!(ctx.chain.validity().live_pairs(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bot_messages_never_reach_the_chain() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let ctx = context(&backend, Arc::new(LoggingGateway::new()), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "The earth is flat").from_bot());
    tokio::time::sleep(Duration::from_secs(1)).await;

    let stats = ctx.metrics.snapshot();
    assert_eq!(stats.messages_discarded, 1);
    assert_eq!(stats.messages_dequeued, 0);
    assert_eq!(backend.validity_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_runs_every_n_dequeues() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let settings = DispatcherConfig {
        reset_every: 3,
        ..dispatcher_settings()
    };
    let ctx = context(&backend, Arc::new(LoggingGateway::new()), settings);
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    for i in 0..3 {
        queue.accept_message(message(&format!("a{i}"), "The earth is round"));
    }
    eventually(|| ctx.gate.status().resets_completed == 1).await;

    for i in 0..3 {
        queue.accept_message(message(&format!("b{i}"), "The earth is round"));
    }
    eventually(|| ctx.gate.status().resets_completed == 2).await;

    assert_eq!(ctx.metrics.snapshot().resets_triggered, 2);
    // Both stages warm up once per reset.
    assert_eq!(backend.warm_ups(), 4);
    assert_eq!(ctx.chain.validity().generation(), 2);
    assert_eq!(ctx.chain.accuracy().generation(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_message_arriving_during_reset_is_moderated_once() {
    let knowledgeable = MockBackend::knowledgeable();
    let backend = Arc::new(MockBackend::new(move |target, warm_up, input| {
        if warm_up {
            Reply::Delayed(Duration::from_millis(150), "READY")
        } else {
            (knowledgeable.script)(target, warm_up, input)
        }
    }));
    let gateway = Arc::new(LoggingGateway::new());
    let ctx = context(&backend, gateway.clone(), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    let resetting = Arc::clone(&ctx);
    let reset = tokio::spawn(async move { resetting.reset().await });
    eventually(|| ctx.gate.is_resetting()).await;

    queue.accept_message(message("m2", "The earth is flat"));
    eventually(|| ctx.metrics.snapshot().requeues >= 1).await;
    assert_eq!(backend.validity_calls(), 0);

    reset.await.unwrap();
    eventually(|| gateway.actions().len() == 2).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let actions = gateway.actions();
    assert_eq!(actions.len(), 2);
    assert!(matches!(&actions[0], GatewayAction::Reply { message_id, .. } if message_id == "m2"));
    assert_eq!(
        actions[1],
        GatewayAction::Delete {
            message_id: "m2".to_string()
        }
    );
    let stats = ctx.metrics.snapshot();
    assert_eq!(stats.messages_accepted, 1);
    // Each requeue is dequeued again.
    assert_eq!(stats.messages_dequeued, 1 + stats.requeues);
    assert_eq!(stats.moderations, 1);
    assert_eq!(stats.classifications, 1);
    assert_eq!(backend.validity_calls(), 1);
    assert_eq!(backend.accuracy_calls(), 1);
    assert_eq!(ctx.gate.status().resets_completed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_reply_still_deletes() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let gateway = Arc::new(BrokenReplyGateway::default());
    let ctx = context(
        &backend,
        gateway.clone() as Arc<dyn ChatGateway>,
        dispatcher_settings(),
    );
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let _loop = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "The earth is flat"));

    eventually(|| !gateway.deleted.lock().is_empty()).await;
    assert_eq!(gateway.deleted.lock().as_slice(), ["m1".to_string()]);
    eventually(|| ctx.metrics.snapshot().moderations == 1).await;
    assert_eq!(ctx.metrics.snapshot().gateway_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_is_isolated() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let gateway = Arc::new(LoggingGateway::new());
    let ctx = context(&backend, gateway.clone(), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let handle = dispatcher.spawn(CancellationToken::new());

    queue.accept_message(message("m1", "boom"));
    eventually(|| backend.validity_calls() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(ctx.gate.in_flight(), 0);
    assert!(!handle.is_finished());

    queue.accept_message(message("m2", "The earth is flat"));
    eventually(|| gateway.actions().len() == 2).await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_loop() {
    let backend = Arc::new(MockBackend::knowledgeable());
    let ctx = context(&backend, Arc::new(LoggingGateway::new()), dispatcher_settings());
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let shutdown = CancellationToken::new();
    let handle = dispatcher.spawn(shutdown.clone());

    shutdown.cancel();
    handle.await.unwrap();

    assert!(queue.is_closed());
}

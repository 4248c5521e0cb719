//! FactBot
//!
//! Moderation bot that checks chat messages with two few-shot LLM stages
//! and removes harmful or false statements.

use anyhow::{Context, Result};
use clap::Parser;
use factbot_core::{ChatGateway, CompletionClient};
use factbot_server::{
    create_router, AppState, BotConfig, Cli, Dispatcher, DiscordGateway, GatewayMode,
    LoggingGateway, ModerationContext, OpenAiCompletionClient, Secrets,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    info!("Starting FactBot");

    let config = BotConfig::load(&cli.config, &cli)?;
    info!(
        config = %cli.config,
        model = %config.completion.model,
        gateway = %config.gateway.mode,
        reset_every = config.dispatcher.reset_every,
        "configuration loaded"
    );

    let secrets = Secrets::load(config.secrets_path())?;

    let metrics_handle = init_metrics()?;

    let client: Arc<dyn CompletionClient> = Arc::new(OpenAiCompletionClient::new(
        &config.completion,
        secrets.openai_api_key()?,
    )?);

    let gateway: Arc<dyn ChatGateway> = match config.gateway.mode {
        GatewayMode::Discord => Arc::new(DiscordGateway::new(
            secrets.discord_token()?,
            config.gateway.api_base.clone(),
        )),
        GatewayMode::DryRun => {
            warn!("dry-run gateway: moderation actions are logged, not sent");
            Arc::new(LoggingGateway::new())
        }
    };

    let ctx = Arc::new(ModerationContext::from_config(&config, client, gateway));

    info!("Warming up classification stages...");
    ctx.warm_up().await;
    info!("Classification stages ready");

    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(Arc::clone(&ctx));
    let queue = dispatcher.queue();
    let dispatcher_task = dispatcher.spawn(shutdown.clone());

    let state = AppState {
        ctx,
        queue,
        metrics_handle: Some(metrics_handle),
    };
    let app = create_router(state, config.server.max_body_bytes);

    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_addr()))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("FactBot listening on http://{}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping...");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(err) = dispatcher_task.await {
        warn!(error = %err, "dispatcher task ended abnormally");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("factbot=debug,factbot_server=debug,factbot_classifiers=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("factbot=info,factbot_server=info,factbot_classifiers=info")
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Install the Prometheus recorder and return the handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    factbot_telemetry::describe_metrics();

    info!("Metrics exporter initialized");
    Ok(handle)
}

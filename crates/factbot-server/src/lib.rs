//! FactBot Server
//!
//! The running bot: messages come in through the intake queue, the
//! dispatcher classifies each one on its own task, and harmful or false
//! statements are answered and removed through the chat gateway.
//!
//! Components:
//! - [`IntakeQueue`] and [`Dispatcher`]: unbounded fan-out with periodic
//!   context resets
//! - [`ModerationContext`]: the stage chain, its reset gate and the gateway
//! - Adapters for an OpenAI-compatible completion API and the Discord REST API
//! - HTTP routes for intake, health, stats and Prometheus metrics

pub mod cli;
pub mod config;
pub mod context;
pub mod discord;
pub mod dispatcher;
pub mod dry_run;
pub mod moderation;
pub mod openai;
pub mod queue;
pub mod routes;
pub mod secrets;

pub use cli::Cli;
pub use config::{BotConfig, DispatcherConfig, GatewayMode};
pub use context::{ModerationContext, ModerationStats};
pub use discord::DiscordGateway;
pub use dispatcher::Dispatcher;
pub use dry_run::{GatewayAction, LoggingGateway};
pub use openai::OpenAiCompletionClient;
pub use queue::IntakeQueue;
pub use routes::{create_router, AppState};
pub use secrets::Secrets;

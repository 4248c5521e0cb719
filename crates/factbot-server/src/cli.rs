//! Command line interface

use crate::config::GatewayMode;
use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "factbot")]
#[command(author, version, about = "Two-stage LLM moderation bot for chat channels", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "factbot.yaml", env = "FACTBOT_CONFIG")]
    pub config: String,

    /// Secrets file (JSON with the completion API key and gateway token)
    #[arg(short, long, env = "FACTBOT_SECRETS")]
    pub secrets: Option<String>,

    /// Listen address for the intake and operational endpoints
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Chat gateway: discord or dry-run
    #[arg(short, long, value_parser = parse_gateway_mode)]
    pub gateway: Option<GatewayMode>,

    /// Dequeues between conversation context resets
    #[arg(long)]
    pub reset_every: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

fn parse_gateway_mode(value: &str) -> Result<GatewayMode, String> {
    value.parse()
}

//! Queue-booking API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  GATEWAY                     │
//!   Client Request    │  ┌────────┐   ┌──────────┐   ┌───────────┐   │
//!   ──────────────────┼─▶│  CORS  │──▶│ classify │──▶│  routing  │   │
//!                     │  │ req-id │   └────┬─────┘   │  (prefix) │   │
//!                     │  └────────┘        │         └─────┬─────┘   │
//!                     │                    ▼ local         ▼ proxy   │
//!                     │             ┌────────────┐   ┌───────────┐   │      User /
//!   Client Response   │             │ health/404 │   │ forwarder │◀──┼───▶  Department
//!   ◀─────────────────┼─────────────│ JSON body  │   │ (stream)  │   │      services
//!                     │             └────────────┘   └───────────┘   │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use queue_gateway::config::load_config;
use queue_gateway::lifecycle::startup;

#[derive(Parser)]
#[command(name = "queue-gateway")]
#[command(about = "Reverse-proxying API gateway for the queue-booking services", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    startup::run(config).await?;
    Ok(())
}

//! Huddle gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p huddle-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env` when present).

use huddle_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Gateway failed to start");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        app = %config.app.name,
        env = ?config.app.env,
        port = config.gateway.port,
        redis = config.redis.is_some(),
        presence_ttl_seconds = config.presence.ttl_seconds,
        typing_ttl_seconds = config.presence.typing_ttl_seconds,
        "Starting Huddle Gateway Server..."
    );

    huddle_gateway::run(config).await?;

    Ok(())
}

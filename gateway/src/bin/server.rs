use tts_gateway::start_server;
use tts_gateway_core::GatewayConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Provider credentials may come from a local .env file
    let dotenv = dotenvy::dotenv();

    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,tts_gateway=info,tts_gateway_core=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(target: "gateway", path = %path.display(), "Loaded .env");
    }

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = GatewayConfig::load();

    start_server(&cfg).await?;
    Ok(())
}

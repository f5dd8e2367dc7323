use tracing::info;

use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use anyhow::anyhow;

use voicebridge::{ServerConfig, routes, state::AppState};

/// Voicebridge - telephony to realtime AI relay server
#[derive(Parser, Debug)]
#[command(name = "voicebridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on (overrides the PORT environment variable)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from environment; a missing API key is fatal
    let mut config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let address = config.address();
    info!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config);

    // Call-setup webhook plus the media-stream WebSocket endpoint
    let app = Router::new()
        .merge(routes::create_api_router())
        .merge(routes::create_media_stream_router())
        .with_state(app_state);

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow!("Failed to bind {address}: {e}"))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow!("Server error: {e}"))?;

    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use podcast_tts::{create_router, AppState, Config, Orchestrator};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "podcast-tts", version, about = "Podcast TTS generation service")]
struct Args {
    /// Config file path, without extension
    #[arg(long, default_value = "config/podcast-tts")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Podcast TTS v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Vendor endpoint: {}", cfg.vendor.ws_url);

    let orchestrator = Orchestrator::from_config(&cfg)
        .await
        .context("Failed to initialize orchestrator")?;
    let app = create_router(AppState::new(orchestrator));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

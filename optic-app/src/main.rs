use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use optic_app::routes;
use optic_browser::{BrowserSession, SessionConfig};
use optic_common::observability::{init_logging, LogConfig};
use optic_config::OpticConfigLoader;
use optic_pipeline::AnalysisPipeline;
use optic_scrape::RelatedImageScraper;
use optic_vision::VisionClient;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "optic",
    about = "Image moderation and related-image retrieval service",
    version
)]
struct Args {
    /// Path to the YAML configuration file. Missing files fall back to
    /// defaults plus OPTIC-prefixed environment overrides.
    #[arg(long, env = "OPTIC_CONFIG", default_value = "optic.yaml")]
    config: PathBuf,

    /// Listening port; overrides the configuration file.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = OpticConfigLoader::new()
        .with_file(&args.config)
        .load()
        .context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(LogConfig {
        emit_stderr: true,
        ..LogConfig::default()
    })?;

    let vision =
        VisionClient::new(&config.vision.endpoint).context("invalid vision endpoint")?;
    let session = Arc::new(BrowserSession::new(SessionConfig {
        webdriver_url: config.browser.webdriver_url.clone(),
        headless: config.browser.headless,
        user_agent: config.browser.user_agent.clone(),
    }));
    let scraper = RelatedImageScraper::new(Arc::clone(&session));
    let pipeline = AnalysisPipeline::new(
        Arc::new(vision),
        Arc::new(scraper),
        config.scrape.fallback_query.clone(),
    );

    let state = Arc::new(routes::AppState { pipeline });
    let router = routes::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("server running on port {}", config.server.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight requests have drained; release the browser before exit.
    session.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for interrupt signal");
    }
    info!("interrupt received, shutting down");
}

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rivalscope_common::Config;
use rivalscope_engine::providers::{HnForumSearcher, SerperNewsSearcher, TrustpilotReviewFetcher};
use rivalscope_engine::{
    ClaudeSummarizer, EnhancedSignalAggregator, InMemoryReportStore, ReportService,
    StreamSessionRegistry,
};

mod routes;
mod ws;

#[derive(Parser)]
#[command(name = "rivalscope-server", about = "RivalScope competitive-intelligence server")]
struct Cli {
    /// Override the bind host from config
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port from config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting rivalscope-server");

    let cli = Cli::parse();
    let config = Config::from_env();
    let host = cli.host.unwrap_or_else(|| config.web_host.clone());
    let port = cli.port.unwrap_or(config.web_port);

    // Signal providers
    let news = Arc::new(SerperNewsSearcher::new(&config.serper_api_key));
    let reviews = Arc::new(TrustpilotReviewFetcher::new(&config.reviews_api_key));
    let forums = Arc::new(HnForumSearcher::new());

    let aggregator = Arc::new(EnhancedSignalAggregator::new(news, reviews, forums));

    // Summarizer: primary model for high effort, smaller model for fallback
    let summarizer = Arc::new(ClaudeSummarizer::new(
        ai_client::Claude::new(&config.anthropic_api_key, &config.summary_model),
        ai_client::Claude::new(&config.anthropic_api_key, &config.summary_fallback_model),
    ));

    let store = Arc::new(InMemoryReportStore::new());
    let streaming = Arc::new(StreamSessionRegistry::new());

    let service = Arc::new(ReportService::new(
        aggregator,
        summarizer,
        store,
        streaming,
    ));

    let app = routes::build_router(service);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app).await.context("Server exited")?;
    Ok(())
}

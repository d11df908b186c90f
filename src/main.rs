use anyhow::Context;
use clap::Parser;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;

use s3_download_manager::config::ServiceConfig;
use s3_download_manager::download::commands::{router, AppState};
use s3_download_manager::download::spawn_registry;
use s3_download_manager::providers::{BlobFetcher, S3Fetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::parse();

    let (registry, _registry_task) = spawn_registry(config.registry_config());
    let fetcher: Arc<dyn BlobFetcher> = Arc::new(S3Fetcher::new(config.aws_config()));

    let listener = TcpListener::bind((config.bind.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.bind, config.port))?;

    info!("Starting up S3 download manager on {}", listener.local_addr()?);

    axum::serve(listener, router(AppState::new(registry, fetcher)))
        .await
        .context("HTTP server failed")?;

    Ok(())
}

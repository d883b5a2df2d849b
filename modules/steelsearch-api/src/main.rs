use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use steel_client::SteelClient;
use steelsearch_api::{router, AppState, SteelSearchRunner};
use steelsearch_common::Config;

#[derive(Parser)]
#[command(name = "steelsearch-api", about = "Search and scrape the web through remote browser sessions")]
struct Cli {
    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let host = cli.host.unwrap_or_else(|| config.host.clone());
    let port = cli.port.unwrap_or(config.port);

    let sessions = SteelClient::new(&config.steel_url)?;
    let state = Arc::new(AppState {
        runner: Arc::new(SteelSearchRunner::new(sessions)),
        steel_url: config.steel_url.clone(),
    });

    let addr = format!("{host}:{port}");
    info!(addr = %addr, steel_url = %config.steel_url, "Steel Search API starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

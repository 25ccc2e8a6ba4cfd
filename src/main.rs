//! Relay daemon entrypoint.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clothesline::chat::{ChatTransport, LineClient};
use clothesline::config::Config;
use clothesline::llm::{CompletionClient, OpenAiClient};
use clothesline::state::AppState;
use clothesline::store::{MemoryStore, SqliteStore, Store};
use clothesline::{broadcast, http};

#[derive(Debug, Parser)]
#[command(name = "clothesline", version, about = "Sensor-to-chat notification relay")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            // A missing ./.env is fine; the environment may be complete.
            let _ = dotenvy::dotenv();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clothesline=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "opening sqlite store");
            Arc::new(SqliteStore::open(path.clone(), config.persistence_timeout()).await?)
        }
        None => {
            info!("no DATABASE_PATH set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let chat: Arc<dyn ChatTransport> = Arc::new(LineClient::new(
        config.chat_base_url.clone(),
        config.channel_access_token.clone(),
        config.request_timeout(),
    )?);
    let completion: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(
        config.completion_base_url.clone(),
        config.completion_api_key.clone(),
        config.completion_model.clone(),
        config.request_timeout(),
    )?);

    let bind_addr = config.bind_addr;
    let broadcast_interval = config.broadcast_interval();
    let state = AppState::new(config, store, chat, completion);

    tokio::spawn(broadcast::run(Arc::clone(&state), broadcast_interval));

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use webpulse::server::{router, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "webpulse",
    about = "WebPulse bridge - crypto prices, news, search and sentiment behind a shared-secret HTTP API"
)]
struct Cli {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen address, e.g. 127.0.0.1:8000
    #[arg(long)]
    bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so RUST_LOG and secrets from it apply
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env");
    }

    let mut config = webpulse::load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    let services = webpulse::build_services(&config)?;
    let state = AppState::new(
        Arc::new(services),
        config.admin_token().map(str::to_string),
    );
    if state.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set, gated endpoints will reject every request");
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %listener.local_addr()?, "Listening");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();

    // Handle shutdown signals
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
        cancel.cancel();
    });

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error")?;

    info!("Shut down");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

use anyhow::Context;
use pigeon_server::app::{create_app, serve};
use pigeon_server::config::AppConfig;
use pigeon_server::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::parse().context("Failed to parse config")?;
    if !config.credentials.is_complete() {
        tracing::warn!("Room service credentials are incomplete, token requests will fail");
    }

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .context("Failed to bind listener")?;
    tracing::info!(addr = ?listener.local_addr()?, "Listening");

    let state = Arc::new(AppState::new(config));
    serve(listener, create_app(), state, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, stopping server");
}

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mockdb_api::{app, config, services::spawn_eviction_sweep, storage, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config().clone();
    tracing::info!("Starting MockDB API in {:?} mode", config.environment);

    // An unreachable backend is fatal
    let storage = storage::connect(&config.storage)
        .await
        .context("failed to initialise storage backend")?;

    let state = AppState::new(config, storage);
    if spawn_eviction_sweep(state.clone()).is_some() {
        tracing::info!(
            "Idle workspace eviction enabled (idle {}s, every {}s)",
            state.config.eviction.idle_secs,
            state.config.eviction.sweep_interval_secs
        );
    }

    // Allow tests or deployments to override port via env
    let port = std::env::var("MOCKDB_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("MockDB API listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}

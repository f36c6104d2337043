//! PPE Guard - Main Entry Point

use anyhow::Context;
use ppeguard_api::config::{AppConfig, CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH};
use ppeguard_api::tenancy::{Fixtures, InMemoryStore};
use ppeguard_api::{build_router, ApiState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("PPE Guard v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let config = AppConfig::load(&config_path).context("loading configuration")?;

    let store = Arc::new(InMemoryStore::new());
    if let Some(seed_path) = &config.seed_path {
        Fixtures::load(seed_path)
            .and_then(|fixtures| fixtures.apply(&store))
            .with_context(|| format!("seeding from {}", seed_path))?;
    } else {
        tracing::warn!("No seed_path configured, starting with an empty store");
    }

    let state = ApiState::from_config(&config, store).context("building integrations")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    tracing::info!("Listening on {}", config.server.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

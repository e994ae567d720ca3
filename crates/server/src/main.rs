//! Claim call server binary

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use claimcall_config::load_settings;
use claimcall_core::ClaimStore;
use claimcall_engine::Reconciler;
use claimcall_provider::HttpVoiceProvider;
use claimcall_server::{create_router, init_metrics, spawn_sweep_loop, AppState};
use claimcall_store::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var("CLAIMCALL_CONFIG").ok();
    let settings = load_settings(config_path.as_deref())?;

    init_metrics()?;

    let store: Arc<dyn ClaimStore> = Arc::new(InMemoryStore::new());
    let provider = Arc::new(HttpVoiceProvider::new(settings.provider.clone())?);
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        provider,
        settings.reconciler.clone(),
    ));

    let state = AppState::new(store, reconciler, settings.clone());
    spawn_sweep_loop(state.clone());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!(addr = %addr, "starting claim call server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

//! Gatehouse governance HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, and the governance engine, seeds the
//! bootstrap administrator, then starts the API and metrics servers.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use gatehouse_controlplane::app::{AppState, build_router};
use gatehouse_controlplane::config::GovernanceConfig;
use gatehouse_controlplane::governance::GovernanceEngine;
use gatehouse_controlplane::observability;
use gatehouse_controlplane::store::GovernanceStore;
use gatehouse_controlplane::store::memory::InMemoryStore;
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GovernanceConfig::from_env_or_yaml()?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: GovernanceConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("gatehouse-controlplane")?;
    let state = build_state(&config).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "governance service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &GovernanceConfig) -> anyhow::Result<AppState> {
    let store = Arc::new(InMemoryStore::new(config.store_config()));
    tracing::info!(
        backend = store.backend_name(),
        durable = store.is_durable(),
        "permission store ready"
    );
    let engine = Arc::new(GovernanceEngine::new(store, config.engine_settings()));
    if let Some(admin) = &config.bootstrap_admin {
        let seeded = engine.bootstrap_admin(admin).await?;
        tracing::info!(actor = %admin, seeded, "bootstrap administrator ensured");
    }
    Ok(AppState::new(engine))
}

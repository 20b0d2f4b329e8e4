//! ChatOps Kubernetes operator — HTTP entry point.

use chatops_core::api;
use chatops_core::bootstrap;
use chatops_core::types::Config;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    chatops_core::observability::init_tracing(&config.observability.log_format);

    let bind_addr = config.server.bind_addr.clone();
    let runtime = bootstrap::bootstrap(config).await?;
    bootstrap::install_shutdown_hooks(runtime.worker.clone(), runtime.shutdown.clone());

    let app = api::router(runtime.app_state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(phase = "system", "chatops operator listening on {}", bind_addr);

    let shutdown = runtime.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

//! Process bootstrap (§2 "Bootstrap", §9 design notes).
//!
//! Wires every collaborator together and starts **exactly one** worker per
//! process — a guarantee that must survive process re-entry (e.g. a
//! framework hot-reload invoking `main` logic twice within the same
//! process), so it is backed by a process-global `OnceLock`, not a
//! module-initialization trick. Grounded on `observability::init_tracing`'s
//! `OnceLock`-guarded one-shot initialization, generalized from "run once"
//! to "build once and hand back the same handle."

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::k8s::{FakeAdapter, KubeClientAdapter, KubernetesAdapter};
use crate::policy::IdentityPolicy;
use crate::state::ExecutionStateRegistry;
use crate::sync::{FifoMutex, PriorityQueue};
use crate::types::{Config, Result};
use crate::worker::{ResultTable, Worker};

/// Everything bootstrap assembles, handed back to `main`.
pub struct Runtime {
    pub app_state: AppState,
    pub worker: Arc<Worker>,
    pub shutdown: CancellationToken,
}

static WORKER_GUARD: OnceLock<()> = OnceLock::new();

/// Builds the full collaborator graph and starts the single worker.
///
/// Calling this more than once within a process is safe: the first call
/// wins and starts the worker; subsequent calls build a fresh (unstarted)
/// collaborator graph for the caller but do not spawn a second run loop,
/// preserving "process-owned singleton" (§4.6) across re-entry.
pub async fn bootstrap(config: Config) -> Result<Runtime> {
    let config = Arc::new(config);

    let adapter: Arc<dyn KubernetesAdapter> = if std::env::var("CHATOPS_FAKE_K8S").is_ok() {
        tracing::warn!(phase = "system", "CHATOPS_FAKE_K8S set, using in-memory fake adapter");
        Arc::new(FakeAdapter::new(1))
    } else {
        Arc::new(KubeClientAdapter::connect(&config.kubernetes).await?)
    };

    let execution_state = ExecutionStateRegistry::new();
    let state_for_queue = execution_state.clone();
    let queue = Arc::new(PriorityQueue::new(Arc::new(move |len| {
        let execution_state = state_for_queue.clone();
        tokio::spawn(async move { execution_state.set_queue_length(len).await });
    })));
    let mutex = Arc::new(FifoMutex::new());
    let identity = Arc::new(IdentityPolicy::new(config.quota.free_limit));
    let results = ResultTable::new();

    let worker = Worker::new(
        queue.clone(),
        mutex,
        adapter.clone(),
        execution_state.clone(),
        results.clone(),
        config.kubernetes.clone(),
    );

    let first_bootstrap_in_process = WORKER_GUARD.set(()).is_ok();
    if first_bootstrap_in_process {
        worker.start().await;
        tracing::info!(phase = "system", "worker started (single instance for this process)");
    } else {
        tracing::warn!(
            phase = "system",
            "bootstrap() re-entered within the same process; returning a fresh, unstarted \
             collaborator graph instead of spawning a second worker"
        );
    }

    let app_state = AppState {
        config,
        identity,
        queue,
        adapter,
        execution_state,
        results,
    };

    Ok(Runtime {
        app_state,
        worker,
        shutdown: CancellationToken::new(),
    })
}

/// Installs SIGINT/SIGTERM hooks that trigger `Worker::graceful_shutdown`
/// and cancel the HTTP server's shutdown token (§4.6 `gracefulShutdown`).
pub fn install_shutdown_hooks(worker: Arc<Worker>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!(phase = "system", error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }

        tracing::info!(phase = "system", "shutdown signal received, starting graceful shutdown");
        worker.graceful_shutdown().await;
        shutdown.cancel();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_with_fake_adapter_starts_a_worker() {
        std::env::set_var("CHATOPS_FAKE_K8S", "1");
        let runtime = bootstrap(Config::default()).await.unwrap();
        let snap = runtime.app_state.execution_state.snapshot().await;
        assert_eq!(snap.worker_status, crate::state::WorkerStatus::Idle);
        runtime.worker.stop().await;
        std::env::remove_var("CHATOPS_FAKE_K8S");
    }
}

//! API boundary / policy gate (§4.7) and the HTTP surface (§6.1).
//!
//! Authenticates, parses, classifies, and either answers synchronously
//! (HELP/READ/DRY_RUN) or enqueues a scheduled command (EXECUTE). Never
//! executes — the worker is the only task that touches the mutex or the
//! adapter's mutating calls.

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::k8s::KubernetesAdapter;
use crate::policy::IdentityPolicy;
use crate::state::ExecutionStateRegistry;
use crate::sync::PriorityQueue;
use crate::types::Config;
use crate::worker::ResultTable;

/// Shared, clonable handle to every collaborator the gate needs. Cheap to
/// clone (every field is an `Arc`) so each axum handler gets its own copy —
/// the same shape as the teacher's `Arc<Mutex<Kernel>>` handle threaded
/// into every gRPC service impl, generalized to several independently
/// locked collaborators instead of one big actor lock, since the gate's
/// non-mutating paths must run fully in parallel (§5) rather than queue
/// behind a single kernel mutex.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<IdentityPolicy>,
    pub queue: Arc<PriorityQueue>,
    pub adapter: Arc<dyn KubernetesAdapter>,
    pub execution_state: Arc<ExecutionStateRegistry>,
    pub results: Arc<ResultTable>,
}

/// Builds the full HTTP router (§6.1): `POST /chat`, `GET /internal/status`,
/// `GET /internal/health`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/internal/status", get(handlers::status))
        .route("/internal/health", get(handlers::health))
        .with_state(state)
}

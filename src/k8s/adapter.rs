//! The `KubernetesAdapter` trait (§4.5) and its read-model types.
//!
//! Dispatched behind a trait object so the worker and API boundary can be
//! exercised against `FakeAdapter` in tests (P4, P5, scenario 5) without a
//! live cluster, the same seam the teacher cuts around its Kernel for
//! `kernel::recovery` tests. Test builds additionally get a `mockall`
//! `MockKubernetesAdapter` (via `#[automock]`, above `#[async_trait]` per
//! mockall's documented ordering for async traits) for call-count/argument
//! assertions `FakeAdapter`'s state-machine style can't express as directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{ExecutionId, Result};

#[cfg(test)]
use mockall::automock;

/// Read snapshot of the target deployment (§3 `K8sStatus`). Never cached.
#[derive(Debug, Clone, Serialize)]
pub struct K8sStatus {
    pub replicas: i32,
    #[serde(rename = "readyReplicas")]
    pub ready_replicas: i32,
    pub pods: Vec<PodInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PodInfo {
    pub name: String,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

/// The single mutating path onto the cluster (I5). Configuration
/// (namespace, deployment, replica bounds) is process-global (I6) and lives
/// in the concrete implementation, not in call arguments.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubernetesAdapter: std::fmt::Debug + Send + Sync {
    /// Preconditions: `1 <= replicas <= <configured ceiling>` (I7), checked
    /// before any outbound call (P5). Never retries.
    async fn scale(&self, replicas: u32, execution_id: &ExecutionId) -> Result<()>;

    /// Patches a `restartedAt` annotation, triggering a rolling restart.
    /// Never deletes a pod directly.
    async fn restart(&self, execution_id: &ExecutionId) -> Result<()>;

    /// Read-only: deployment + pod list by label selector `app=<deployment>`.
    async fn status(&self, execution_id: &ExecutionId) -> Result<K8sStatus>;
}

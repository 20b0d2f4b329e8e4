//! Process-wide observability snapshot (§3 `ExecutionState`, §4.8).
//!
//! Single instance, initialized at process start, written by the queue,
//! mutex, and worker and read by the `/internal/status` and
//! `/internal/health` handlers. Grounded on the teacher's single-lock,
//! snapshot-clone shape (`grpc::kernel_service::KernelServiceImpl` wrapping
//! `Arc<Mutex<Kernel>>`) generalized from a per-request actor lock to a
//! plain `RwLock<Inner>` behind an `Arc` — there is no actor here, only a
//! bag of fields multiple call sites write independently. Setters are
//! fire-and-forget (no ordering guarantees across concurrent setters, as
//! required by §4.8); readers get a deep-copied snapshot.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::command::SanitizedCommand;

/// `workerStatus` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Executing,
}

/// `mutexStatus` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutexStatus {
    Free,
    Locked,
}

/// `lastResult` (§3) — the outcome of the most recently completed command,
/// if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastResult {
    pub status: &'static str,
    #[serde(rename = "commandId")]
    pub command_id: String,
}

struct Inner {
    worker_status: WorkerStatus,
    queue_length: usize,
    mutex_status: MutexStatus,
    current_command: Option<SanitizedCommand>,
    last_result: Option<LastResult>,
    last_error: Option<String>,
    started_at: Instant,
}

/// Deep-copied, point-in-time view returned to readers (`/internal/status`,
/// `/internal/health`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionStateSnapshot {
    #[serde(rename = "workerStatus")]
    pub worker_status: WorkerStatus,
    #[serde(rename = "queueLength")]
    pub queue_length: usize,
    #[serde(rename = "mutexStatus")]
    pub mutex_status: MutexStatus,
    #[serde(rename = "currentCommand")]
    pub current_command: Option<SanitizedCommand>,
    #[serde(rename = "lastResult")]
    pub last_result: Option<LastResult>,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
    #[serde(rename = "uptimeMs")]
    pub uptime_ms: u128,
}

/// Process-singleton execution state registry. Holds no secrets:
/// `current_command` is always a `SanitizedCommand` (§4.8).
#[derive(Debug)]
pub struct ExecutionStateRegistry {
    inner: RwLock<Inner>,
}

impl ExecutionStateRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner {
                worker_status: WorkerStatus::Idle,
                queue_length: 0,
                mutex_status: MutexStatus::Free,
                current_command: None,
                last_result: None,
                last_error: None,
                started_at: Instant::now(),
            }),
        })
    }

    pub async fn set_queue_length(&self, len: usize) {
        self.inner.write().await.queue_length = len;
    }

    /// Publishes `workerStatus=executing`, `mutexStatus=locked`, and the
    /// sanitized command — invariant I2 holds by construction since these
    /// three fields are always set together by the worker.
    pub async fn mark_executing(&self, command: SanitizedCommand) {
        let mut inner = self.inner.write().await;
        inner.worker_status = WorkerStatus::Executing;
        inner.mutex_status = MutexStatus::Locked;
        inner.current_command = Some(command);
    }

    /// Publishes `workerStatus=idle`, `mutexStatus=free`, clears the current
    /// command (I2, worker step 6).
    pub async fn mark_idle(&self) {
        let mut inner = self.inner.write().await;
        inner.worker_status = WorkerStatus::Idle;
        inner.mutex_status = MutexStatus::Free;
        inner.current_command = None;
    }

    pub async fn record_success(&self, command_id: String) {
        let mut inner = self.inner.write().await;
        inner.last_result = Some(LastResult {
            status: "success",
            command_id,
        });
        inner.last_error = None;
    }

    pub async fn record_failure(&self, command_id: String, error: String) {
        let mut inner = self.inner.write().await;
        inner.last_result = Some(LastResult {
            status: "failed",
            command_id,
        });
        inner.last_error = Some(error);
    }

    /// Deep-copied view for readers (`/internal/status`, `/internal/health`).
    pub async fn snapshot(&self) -> ExecutionStateSnapshot {
        let inner = self.inner.read().await;
        ExecutionStateSnapshot {
            worker_status: inner.worker_status,
            queue_length: inner.queue_length,
            mutex_status: inner.mutex_status,
            current_command: inner.current_command.clone(),
            last_result: inner.last_result.clone(),
            last_error: inner.last_error.clone(),
            uptime_ms: inner.started_at.elapsed().as_millis(),
        }
    }
}
